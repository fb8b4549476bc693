//! Repository entity - the root aggregate every other entity hangs off.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Repository model. The primary key is the GraphQL node id assigned by the
/// platform, so re-crawling the same repository converges on one row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// Platform-assigned node id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Full name (owner/name).
    pub name: String,
    /// Star count at observation time.
    pub star_count: i32,
    /// When the repository was last updated on the platform.
    pub updated_at: DateTimeUtc,
    /// Crawl-progress watermark: when this repository's full sub-entity
    /// traversal last completed successfully.
    pub last_crawled_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::issue::Entity")]
    Issue,
    #[sea_orm(has_many = "super::pull_request::Entity")]
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
