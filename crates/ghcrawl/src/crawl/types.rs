//! Shared crawl types and defaults.

use chrono::NaiveDate;
use thiserror::Error;

use crate::github::GitHubError;
use crate::store::StoreError;

/// Default page size for every paginated connection.
pub const DEFAULT_BATCH_SIZE: u32 = 50;

/// Default total number of repositories to crawl before stopping.
pub const DEFAULT_TOTAL_REPOS: usize = 10_000;

/// Default star floor for the search space.
pub const DEFAULT_MIN_STARS: u32 = 100;

/// Default match count at which a partition is split.
pub const DEFAULT_PARTITION_THRESHOLD: u64 = 1_000;

/// Default start of the creation-date axis.
pub const DEFAULT_START_YEAR: i32 = 2024;
pub const DEFAULT_START_MONTH: u32 = 1;

/// Options for a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Records requested per page, clamped to the API's limit downstream.
    pub batch_size: u32,
    /// Stop after this many repositories have been assigned to workers.
    pub total_num_repo: usize,
    /// Only crawl repositories with at least this many stars.
    pub min_stars: u32,
    /// Match count at which a search partition is split.
    pub partition_threshold: u64,
    /// Creation-date axis starts at the first of this year/month.
    pub start_year: i32,
    pub start_month: u32,
    /// Concurrent repository workers. `None` sizes to the token pool.
    pub concurrency: Option<usize>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            total_num_repo: DEFAULT_TOTAL_REPOS,
            min_stars: DEFAULT_MIN_STARS,
            partition_threshold: DEFAULT_PARTITION_THRESHOLD,
            start_year: DEFAULT_START_YEAR,
            start_month: DEFAULT_START_MONTH,
            concurrency: None,
        }
    }
}

impl CrawlOptions {
    /// First day of the configured start month. Falls back to the default
    /// epoch when the configured pair is not a real date.
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year, self.start_month, 1).unwrap_or_else(|| {
            NaiveDate::from_ymd_opt(DEFAULT_START_YEAR, DEFAULT_START_MONTH, 1)
                .expect("default start date is valid")
        })
    }
}

/// Sub-entity traversals under one repository, in crawl order. Comments
/// depend on both issue and pull request ids, so they come after both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubEntityKind {
    Issues,
    PullRequests,
    Comments,
    Reviews,
    CiChecks,
}

impl SubEntityKind {
    pub const ORDER: [SubEntityKind; 5] = [
        SubEntityKind::Issues,
        SubEntityKind::PullRequests,
        SubEntityKind::Comments,
        SubEntityKind::Reviews,
        SubEntityKind::CiChecks,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubEntityKind::Issues => "issues",
            SubEntityKind::PullRequests => "pull requests",
            SubEntityKind::Comments => "comments",
            SubEntityKind::Reviews => "reviews",
            SubEntityKind::CiChecks => "ci checks",
        }
    }
}

/// Lifecycle of one repository inside a crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Pending,
    Fetching(SubEntityKind),
    Upserting,
    Done,
    Failed,
}

/// Why one repository's crawl failed. Failures are per repository; the run
/// continues with the rest.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A repository whose crawl failed after retries.
#[derive(Debug)]
pub struct FailedRepo {
    pub id: String,
    pub name: String,
    pub error: String,
}

/// Outcome of a crawl run.
#[derive(Debug, Default)]
pub struct CrawlSummary {
    /// Repositories fully crawled and committed.
    pub crawled: usize,
    /// Repositories that failed after retries.
    pub failed: Vec<FailedRepo>,
    /// Malformed records dropped during mapping.
    pub malformed_records: usize,
    /// Leaf partitions traversed.
    pub partitions: usize,
    /// Partitions abandoned because their count probe or search traversal
    /// kept failing.
    pub skipped_partitions: usize,
    /// Whether the run stopped early on a shutdown request.
    pub interrupted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default() {
        let options = CrawlOptions::default();

        assert_eq!(options.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(options.total_num_repo, DEFAULT_TOTAL_REPOS);
        assert_eq!(options.min_stars, DEFAULT_MIN_STARS);
        assert_eq!(options.partition_threshold, DEFAULT_PARTITION_THRESHOLD);
        assert_eq!(
            options.start_date(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn bogus_start_month_falls_back_to_the_default_epoch() {
        let options = CrawlOptions {
            start_month: 13,
            ..CrawlOptions::default()
        };
        assert_eq!(
            options.start_date(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn sub_entity_order_puts_comments_after_both_parents() {
        let comments = SubEntityKind::ORDER
            .iter()
            .position(|k| *k == SubEntityKind::Comments)
            .unwrap();
        let issues = SubEntityKind::ORDER
            .iter()
            .position(|k| *k == SubEntityKind::Issues)
            .unwrap();
        let prs = SubEntityKind::ORDER
            .iter()
            .position(|k| *k == SubEntityKind::PullRequests)
            .unwrap();

        assert!(comments > issues && comments > prs);
    }
}
