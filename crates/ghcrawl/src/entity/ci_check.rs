//! CIcheck entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// CI check model - one check run on a pull request's head commit.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ci_checks")]
pub struct Model {
    /// Platform-assigned node id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning pull request.
    pub pull_request_id: String,
    /// Check name.
    pub name: String,
    /// When the check started on the platform.
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pull_request::Entity",
        from = "Column::PullRequestId",
        to = "super::pull_request::Column::Id"
    )]
    PullRequest,
}

impl Related<super::pull_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PullRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
