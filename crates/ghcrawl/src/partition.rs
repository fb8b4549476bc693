//! Search-space partitioning to defeat the API's result-window cap.
//!
//! The search endpoint reports the true match count but returns at most
//! [`SEARCH_RESULT_CEILING`] results per query, silently truncating the tail.
//! The planner covers the space with disjoint rectangles over
//! (star count × creation date), probing each with a count-only query and
//! splitting any rectangle whose count reaches the ceiling. Assuming the
//! underlying data holds still, every matching repository lands in exactly
//! one leaf rectangle.
//!
//! Splitting is an explicit work queue rather than recursion, so
//! cancellation and progress reporting stay straightforward.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::github::GitHubError;

/// Hard ceiling on results returned per search query.
pub const SEARCH_RESULT_CEILING: u64 = 1000;

/// Inclusive star-count range; `max: None` means unbounded above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarRange {
    pub min: u32,
    pub max: Option<u32>,
}

impl StarRange {
    /// Open-ended range starting at `min`.
    pub fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }

    /// Number of distinct star counts covered, or `None` if unbounded.
    fn width(&self) -> Option<u32> {
        self.max.map(|max| max.saturating_sub(self.min))
    }

    fn is_splittable(&self) -> bool {
        match self.max {
            None => true,
            Some(max) => max > self.min,
        }
    }

    /// Halve the range. Unbounded ranges split by doubling the lower bound,
    /// which converges because star counts thin out exponentially.
    fn split(&self) -> (StarRange, StarRange) {
        match self.max {
            None => {
                let pivot = self.min.saturating_mul(2).max(self.min + 1);
                (
                    StarRange {
                        min: pivot + 1,
                        max: None,
                    },
                    StarRange {
                        min: self.min,
                        max: Some(pivot),
                    },
                )
            }
            Some(max) => {
                let mid = self.min + (max - self.min) / 2;
                (
                    StarRange {
                        min: mid + 1,
                        max: Some(max),
                    },
                    StarRange {
                        min: self.min,
                        max: Some(mid),
                    },
                )
            }
        }
    }

    fn query_term(&self) -> String {
        match self.max {
            None => format!("stars:>={}", self.min),
            Some(max) => format!("stars:{}..{}", self.min, max),
        }
    }
}

/// One rectangle of the search space: a star range crossed with an inclusive
/// creation-date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub stars: StarRange,
    pub created_from: NaiveDate,
    pub created_to: NaiveDate,
}

impl Partition {
    /// The root rectangle for a crawl: `[min_stars, ∞) × [start, today]`.
    pub fn root(min_stars: u32, created_from: NaiveDate, created_to: NaiveDate) -> Self {
        Self {
            stars: StarRange::at_least(min_stars),
            created_from,
            created_to,
        }
    }

    /// Render the rectangle as a search query.
    pub fn search_query(&self) -> String {
        format!(
            "is:public {} created:{}..{}",
            self.stars.query_term(),
            self.created_from.format("%Y-%m-%d"),
            self.created_to.format("%Y-%m-%d"),
        )
    }

    fn dates_splittable(&self) -> bool {
        self.created_to > self.created_from
    }

    /// Split into two disjoint halves, first element to be crawled first.
    ///
    /// The axis with more remaining granularity is halved: an unbounded star
    /// range always wins, a bounded one wins while its width exceeds the
    /// date span in days, and ties fall to the date axis so crawl order
    /// stays deterministic and newest-first. Returns `None` when both axes
    /// are at minimum granularity (one star value × one day).
    pub fn split(&self) -> Option<(Partition, Partition)> {
        let stars_splittable = self.stars.is_splittable();
        let dates_splittable = self.dates_splittable();

        let split_stars = match (stars_splittable, dates_splittable) {
            (false, false) => return None,
            (true, false) => true,
            (false, true) => false,
            (true, true) => match self.stars.width() {
                None => true,
                Some(width) => {
                    i64::from(width) > (self.created_to - self.created_from).num_days()
                }
            },
        };

        if split_stars {
            let (high, low) = self.stars.split();
            Some((
                Partition {
                    stars: high,
                    ..self.clone()
                },
                Partition {
                    stars: low,
                    ..self.clone()
                },
            ))
        } else {
            let span = self.created_to - self.created_from;
            let mid = self.created_from + span / 2;
            let newer = Partition {
                stars: self.stars.clone(),
                created_from: mid + chrono::Days::new(1),
                created_to: self.created_to,
            };
            let older = Partition {
                stars: self.stars.clone(),
                created_from: self.created_from,
                created_to: mid,
            };
            Some((newer, older))
        }
    }
}

/// Issues the count-only probe for a rectangle. Implemented by the GraphQL
/// client; tests substitute a synthetic index.
#[async_trait]
pub trait MatchCounter: Send + Sync {
    async fn count_matches(&self, partition: &Partition) -> Result<u64, GitHubError>;
}

/// Work queue of rectangles pending a count probe.
#[derive(Debug)]
pub struct PartitionPlanner {
    queue: VecDeque<Partition>,
    ceiling: u64,
    skipped: usize,
}

impl PartitionPlanner {
    /// Start from a root rectangle. `threshold` is the configured split
    /// trigger; it is capped by the API's hard ceiling since counts at or
    /// above that are already truncated.
    pub fn new(root: Partition, threshold: u64) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(root);
        Self {
            queue,
            ceiling: threshold.clamp(1, SEARCH_RESULT_CEILING),
            skipped: 0,
        }
    }

    /// Rectangles still waiting for a probe.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Rectangles dropped because their count probe kept failing.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Produce the next leaf partition and its match count, splitting
    /// over-ceiling rectangles along the way. Returns `None` when the
    /// search space is exhausted.
    ///
    /// A rectangle whose count probe fails (after the client's retries) is
    /// dropped with a warning rather than aborting the crawl; the summary
    /// reports the skip.
    pub async fn next_leaf<C: MatchCounter + ?Sized>(
        &mut self,
        counter: &C,
    ) -> Option<(Partition, u64)> {
        while let Some(partition) = self.queue.pop_front() {
            let count = match counter.count_matches(&partition).await {
                Ok(count) => count,
                Err(err) => {
                    tracing::warn!(
                        query = %partition.search_query(),
                        error = %err,
                        "count probe failed, skipping partition"
                    );
                    self.skipped += 1;
                    continue;
                }
            };

            if count == 0 {
                continue;
            }

            if count >= self.ceiling {
                if let Some((first, second)) = partition.split() {
                    tracing::debug!(
                        query = %partition.search_query(),
                        count,
                        ceiling = self.ceiling,
                        "partition at result ceiling, splitting"
                    );
                    self.queue.push_front(second);
                    self.queue.push_front(first);
                    continue;
                }
                tracing::warn!(
                    query = %partition.search_query(),
                    count,
                    "partition at minimum granularity still exceeds the result ceiling; tail will be truncated"
                );
            }

            return Some((partition, count));
        }

        None
    }
}
