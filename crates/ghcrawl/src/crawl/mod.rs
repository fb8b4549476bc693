//! Crawl orchestration.
//!
//! Split into:
//! - `types`: options, defaults, summary and error types
//! - `progress`: progress event reporting
//! - `worker`: per-repository sub-entity traversal and commit
//! - `coordinator`: partition walking, assignment, worker fan-out

mod coordinator;
mod progress;
#[cfg(test)]
pub(crate) mod testutil;
mod types;
mod worker;

pub use coordinator::Crawler;
pub use progress::{CrawlProgress, ProgressCallback, emit};
pub use types::{
    CrawlError, CrawlOptions, CrawlSummary, DEFAULT_BATCH_SIZE, DEFAULT_MIN_STARS,
    DEFAULT_PARTITION_THRESHOLD, DEFAULT_START_MONTH, DEFAULT_START_YEAR, DEFAULT_TOTAL_REPOS,
    FailedRepo, RepoState, SubEntityKind,
};
