//! Validated domain records, decoupled from both the wire shapes and the
//! database rows.
//!
//! The mapper produces these from raw GraphQL nodes; the storage layer
//! converts them to active models. Keeping the middle layer typed means a
//! schema change on either side stays local to its adapter.

use chrono::{DateTime, Utc};

/// A repository observed by a search traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRecord {
    /// Platform-assigned node id.
    pub id: String,
    /// Full name (owner/name).
    pub name: String,
    pub star_count: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRecord {
    pub id: String,
    pub repository_id: String,
    pub number: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    pub id: String,
    pub repository_id: String,
    pub number: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// The single parent a comment hangs off. Exactly one variant exists per
/// comment; the nullable column pair is a storage encoding, not a domain
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentParent {
    Issue(String),
    PullRequest(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub id: String,
    pub parent: CommentParent,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub id: String,
    pub pull_request_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// One CI check run on a pull request's head commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiCheckRecord {
    pub id: String,
    pub pull_request_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Everything harvested for one repository, committed in a single
/// transaction so a repository is either fully stored or not at all.
#[derive(Debug, Clone, Default)]
pub struct RepoBatch {
    pub repository: Option<RepoRecord>,
    pub issues: Vec<IssueRecord>,
    pub pull_requests: Vec<PullRequestRecord>,
    pub comments: Vec<CommentRecord>,
    pub reviews: Vec<ReviewRecord>,
    pub ci_checks: Vec<CiCheckRecord>,
}

impl RepoBatch {
    /// Start a batch for one repository.
    pub fn for_repository(repository: RepoRecord) -> Self {
        Self {
            repository: Some(repository),
            ..Self::default()
        }
    }

    /// Total number of records across every table.
    pub fn record_count(&self) -> usize {
        usize::from(self.repository.is_some())
            + self.issues.len()
            + self.pull_requests.len()
            + self.comments.len()
            + self.reviews.len()
            + self.ci_checks.len()
    }
}
