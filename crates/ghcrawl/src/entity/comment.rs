//! Comment entity.
//!
//! The nullable `issue_id`/`pull_request_id` pair is a storage-layer
//! concession; the domain model uses the tagged [`crate::model::CommentParent`]
//! variant and the storage adapter encodes it here. A CHECK constraint in the
//! schema guarantees at least one parent id is set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Comment model, parented by exactly one of an issue or a pull request.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    /// Platform-assigned node id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Parent issue, when the comment belongs to an issue.
    pub issue_id: Option<String>,
    /// Parent pull request, when the comment belongs to a pull request.
    pub pull_request_id: Option<String>,
    /// Comment body.
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// When the comment was created on the platform.
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::issue::Entity",
        from = "Column::IssueId",
        to = "super::issue::Column::Id"
    )]
    Issue,
    #[sea_orm(
        belongs_to = "super::pull_request::Entity",
        from = "Column::PullRequestId",
        to = "super::pull_request::Column::Id"
    )]
    PullRequest,
}

impl Related<super::issue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issue.def()
    }
}

impl Related<super::pull_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PullRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
