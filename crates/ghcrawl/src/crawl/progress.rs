//! Progress reporting for crawl runs.
//!
//! The engine stays UI-free; callers observe a run through an optional
//! callback and render however they like (log lines, progress bar).

use super::types::RepoState;

/// Progress events emitted during a crawl run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CrawlProgress {
    /// A leaf partition is about to be traversed.
    PartitionReady {
        /// The search query covering the partition.
        query: String,
        /// Match count reported by the count probe.
        matches: u64,
    },

    /// A partition was abandoned after repeated failures.
    PartitionSkipped {
        /// The search query covering the partition.
        query: String,
        /// Why it was abandoned.
        error: String,
    },

    /// A repository was assigned to a worker.
    RepositoryAssigned {
        /// Full name (owner/name).
        name: String,
        /// Repositories assigned so far, including this one.
        assigned_so_far: usize,
        /// Assignment budget for the run.
        total: usize,
    },

    /// A repository's worker moved to a new lifecycle state.
    RepositoryState {
        /// Full name (owner/name).
        name: String,
        state: RepoState,
    },

    /// A repository was fully crawled and committed.
    RepositoryDone {
        /// Full name (owner/name).
        name: String,
        /// Rows written for it, across every table.
        records: usize,
    },

    /// A repository's crawl failed after retries.
    RepositoryFailed {
        /// Full name (owner/name).
        name: String,
        /// Error message.
        error: String,
    },

    /// Malformed records were dropped while mapping a repository.
    MalformedRecords {
        /// Full name (owner/name).
        name: String,
        /// Number of records dropped.
        count: usize,
    },

    /// The run finished, normally or by shutdown.
    Finished {
        /// Repositories fully crawled.
        crawled: usize,
        /// Repositories that failed.
        failed: usize,
        /// Whether a shutdown request cut the run short.
        interrupted: bool,
    },
}

/// Callback for progress updates during a crawl run.
pub type ProgressCallback = Box<dyn Fn(CrawlProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: CrawlProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
