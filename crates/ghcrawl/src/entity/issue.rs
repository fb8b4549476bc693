//! Issue entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Issue model. `(repository_id, number)` is unique at the schema level in
/// addition to the node-id primary key.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    /// Platform-assigned node id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning repository.
    pub repository_id: String,
    /// Issue number within the repository.
    pub number: i32,
    /// Issue title.
    pub title: String,
    /// When the issue was created on the platform.
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryId",
        to = "super::repository::Column::Id"
    )]
    Repository,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
