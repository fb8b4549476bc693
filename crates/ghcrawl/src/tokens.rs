//! Multi-token credential pool with per-token rate-limit budgets.
//!
//! Every GraphQL request leases a token from the pool, and every response
//! reports the token's remaining budget back. When all tokens are exhausted
//! the pool blocks callers until the earliest reset deadline elapses, so
//! workers stall instead of burning requests that would be rejected.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Budget assumed for a token we have not yet seen a response for.
/// GitHub's GraphQL API grants 5000 points per hour per token.
const ASSUMED_BUDGET: u32 = 5000;

/// Cooldown applied when a token is reported exhausted without a reset time.
const FALLBACK_COOLDOWN: std::time::Duration = std::time::Duration::from_secs(60);

/// A leased token. The slot index ties budget reports back to the pool.
#[derive(Debug, Clone)]
pub struct Lease {
    /// Index of the slot this lease came from.
    pub slot: usize,
    /// The bearer token itself.
    pub token: String,
}

#[derive(Debug)]
struct Slot {
    token: String,
    /// Believed remaining quota. Zero means exhausted until `reset_deadline`.
    remaining: u32,
    /// When an exhausted token becomes usable again.
    reset_deadline: Option<Instant>,
    /// Monotonic use counter value at last acquisition, for LRU tie-breaks.
    last_used: u64,
}

#[derive(Debug)]
struct PoolState {
    slots: Vec<Slot>,
    use_counter: u64,
}

/// Pool of API tokens with greedy highest-budget selection.
///
/// The slot table is the only state shared across crawl workers; it is
/// guarded by a mutex that is never held across an await point.
#[derive(Debug)]
pub struct TokenPool {
    state: Mutex<PoolState>,
}

impl TokenPool {
    /// Create a pool from the configured token list.
    ///
    /// # Panics
    /// Panics if `tokens` is empty; the crawler cannot run without credentials.
    pub fn new(tokens: Vec<String>) -> Self {
        assert!(!tokens.is_empty(), "token pool requires at least one token");

        let slots = tokens
            .into_iter()
            .map(|token| Slot {
                token,
                remaining: ASSUMED_BUDGET,
                reset_deadline: None,
                last_used: 0,
            })
            .collect();

        Self {
            state: Mutex::new(PoolState {
                slots,
                use_counter: 0,
            }),
        }
    }

    /// Number of tokens in the pool. Also the natural crawl worker count.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    /// True if the pool has no tokens. Unreachable in practice given `new`.
    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }

    /// Lease a token believed to have remaining quota.
    ///
    /// Selection picks the token with the highest known remaining budget,
    /// ties broken by least-recently-used. If every token is exhausted this
    /// yields until the earliest reset deadline elapses, then retries with
    /// that token treated as usable again. Never errors.
    pub async fn acquire(&self) -> Lease {
        loop {
            let wait_until = {
                let mut state = self.lock();
                let now = Instant::now();

                // Revive tokens whose reset deadline has passed.
                for slot in &mut state.slots {
                    if slot.remaining == 0 && slot.reset_deadline.is_none_or(|d| d <= now) {
                        slot.remaining = 1;
                        slot.reset_deadline = None;
                    }
                }

                let best = state
                    .slots
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.remaining > 0)
                    .max_by(|(_, a), (_, b)| {
                        a.remaining
                            .cmp(&b.remaining)
                            .then(b.last_used.cmp(&a.last_used))
                    })
                    .map(|(i, _)| i);

                if let Some(slot) = best {
                    state.use_counter += 1;
                    state.slots[slot].last_used = state.use_counter;
                    return Lease {
                        slot,
                        token: state.slots[slot].token.clone(),
                    };
                }

                state.slots.iter().filter_map(|s| s.reset_deadline).min()
            };

            match wait_until {
                Some(deadline) => {
                    tracing::info!(
                        wait_ms = deadline.saturating_duration_since(Instant::now()).as_millis()
                            as u64,
                        "all tokens exhausted, waiting for earliest rate-limit reset"
                    );
                    tokio::time::sleep_until(deadline).await;
                }
                // No deadline recorded; revival on the next pass will free a
                // slot, so just yield.
                None => tokio::task::yield_now().await,
            }
        }
    }

    /// Record a token's budget from a response envelope.
    pub fn report(&self, slot: usize, remaining: u32, reset_at: DateTime<Utc>) {
        let deadline = deadline_from(reset_at);
        let mut state = self.lock();
        if let Some(s) = state.slots.get_mut(slot) {
            s.remaining = remaining;
            s.reset_deadline = (remaining == 0).then_some(deadline);
        }
    }

    /// Mark a token exhausted after a rate-limit rejection.
    ///
    /// Used when the API rejects a request outright (403/429) and the usual
    /// budget envelope is absent; without a reset time a fixed cooldown
    /// applies.
    pub fn mark_exhausted(&self, slot: usize, reset_at: Option<DateTime<Utc>>) {
        let deadline = reset_at
            .map(deadline_from)
            .unwrap_or_else(|| Instant::now() + FALLBACK_COOLDOWN);
        let mut state = self.lock();
        if let Some(s) = state.slots.get_mut(slot) {
            s.remaining = 0;
            s.reset_deadline = Some(deadline);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Convert a wall-clock reset time into an in-process deadline.
///
/// Using tokio instants keeps the pool compatible with paused-clock tests and
/// immune to wall-clock jumps mid-crawl.
fn deadline_from(reset_at: DateTime<Utc>) -> Instant {
    let delta = (reset_at - Utc::now()).to_std().unwrap_or_default();
    Instant::now() + delta
}
