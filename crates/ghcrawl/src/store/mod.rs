//! Storage layer: idempotent commits of crawled records.
//!
//! The only write path is [`commit_batch`]; reads happen out of band through
//! whatever analysis tooling sits on the database. Split into:
//! - `errors`: error types for store operations
//! - `convert`: domain record to active model conversions
//! - `upsert`: the transactional batch commit

mod convert;
mod errors;
mod upsert;

pub use errors::{Result, StoreError};
pub use upsert::commit_batch;
