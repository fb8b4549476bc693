use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur while committing crawled records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    /// A write violated a schema constraint. These indicate a crawler bug
    /// (child committed without its parent, comment with no parent id), so
    /// they are split out from transport-level database errors.
    #[error("constraint violation: {message}")]
    Constraint { message: String },
}

impl StoreError {
    /// Classify a database error, promoting constraint violations so the
    /// caller can tell a crawler bug from a flaky connection.
    pub(crate) fn classify(err: DbErr) -> Self {
        let text = err.to_string().to_lowercase();
        if text.contains("foreign key")
            || text.contains("unique constraint")
            || text.contains("check constraint")
        {
            Self::Constraint {
                message: err.to_string(),
            }
        } else {
            Self::Database(err)
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
