//! Common re-exports for convenient entity usage.

pub use super::ci_check::{
    ActiveModel as CiCheckActiveModel, Column as CiCheckColumn, Entity as CiCheck,
    Model as CiCheckModel,
};
pub use super::comment::{
    ActiveModel as CommentActiveModel, Column as CommentColumn, Entity as Comment,
    Model as CommentModel,
};
pub use super::issue::{
    ActiveModel as IssueActiveModel, Column as IssueColumn, Entity as Issue, Model as IssueModel,
};
pub use super::pull_request::{
    ActiveModel as PullRequestActiveModel, Column as PullRequestColumn, Entity as PullRequest,
    Model as PullRequestModel,
};
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};
pub use super::review::{
    ActiveModel as ReviewActiveModel, Column as ReviewColumn, Entity as Review,
    Model as ReviewModel,
};

