//! Progress reporting for crawl runs.
//!
//! Two modes:
//! - Interactive mode (TTY): an animated assignment bar using indicatif
//! - Logging mode (non-TTY): structured logging using tracing

use std::sync::{Arc, Mutex};

use console::Term;
use ghcrawl::crawl::{CrawlProgress, ProgressCallback, RepoState};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Interactive progress bar for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter)
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: CrawlProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| {
            reporter.handle(event);
        })
    }

    /// Finish the progress bar (interactive mode only).
    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Animated progress bar over the assignment budget.
pub struct InteractiveReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl InteractiveReporter {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn bar_for(&self, total: usize) -> ProgressBar {
        let mut guard = self.bar.lock().expect("progress bar lock");
        guard
            .get_or_insert_with(|| {
                let bar = ProgressBar::new(total as u64);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} repos {msg}",
                    )
                    .expect("valid progress template")
                    .progress_chars("=> "),
                );
                bar
            })
            .clone()
    }

    fn handle(&self, event: CrawlProgress) {
        match event {
            CrawlProgress::PartitionReady { query, matches } => {
                if let Some(bar) = self.bar.lock().expect("progress bar lock").as_ref() {
                    bar.set_message(format!("partition `{query}` ({matches} matches)"));
                }
            }
            CrawlProgress::RepositoryAssigned { name, total, .. } => {
                let bar = self.bar_for(total);
                bar.set_message(name);
            }
            CrawlProgress::RepositoryDone { .. } | CrawlProgress::RepositoryFailed { .. } => {
                if let Some(bar) = self.bar.lock().expect("progress bar lock").as_ref() {
                    bar.inc(1);
                }
            }
            CrawlProgress::Finished {
                crawled,
                failed,
                interrupted,
            } => {
                if let Some(bar) = self.bar.lock().expect("progress bar lock").as_ref() {
                    let suffix = if interrupted { " (interrupted)" } else { "" };
                    bar.finish_with_message(format!(
                        "{crawled} crawled, {failed} failed{suffix}"
                    ));
                }
            }
            _ => {}
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.lock().expect("progress bar lock").as_ref() {
            if !bar.is_finished() {
                bar.finish_and_clear();
            }
        }
    }
}

/// Structured-logging reporter for non-TTY runs.
pub struct LoggingReporter;

impl LoggingReporter {
    fn handle(&self, event: CrawlProgress) {
        match event {
            CrawlProgress::PartitionReady { query, matches } => {
                tracing::info!(%query, matches, "traversing partition");
            }
            CrawlProgress::PartitionSkipped { query, error } => {
                tracing::warn!(%query, %error, "partition skipped");
            }
            CrawlProgress::RepositoryAssigned {
                name,
                assigned_so_far,
                total,
            } => {
                tracing::info!(repo = %name, assigned = assigned_so_far, total, "assigned");
            }
            CrawlProgress::RepositoryState { name, state } => {
                if let RepoState::Fetching(kind) = state {
                    tracing::debug!(repo = %name, phase = kind.label(), "fetching");
                }
            }
            CrawlProgress::RepositoryDone { name, records } => {
                tracing::info!(repo = %name, records, "crawled");
            }
            CrawlProgress::RepositoryFailed { name, error } => {
                tracing::warn!(repo = %name, %error, "crawl failed");
            }
            CrawlProgress::MalformedRecords { name, count } => {
                tracing::warn!(repo = %name, count, "dropped malformed records");
            }
            CrawlProgress::Finished {
                crawled,
                failed,
                interrupted,
            } => {
                tracing::info!(crawled, failed, interrupted, "run finished");
            }
            _ => {}
        }
    }
}
