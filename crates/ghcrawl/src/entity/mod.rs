//! SeaORM entity definitions for the crawler database schema.

pub mod ci_check;
pub mod comment;
pub mod issue;
pub mod prelude;
pub mod pull_request;
pub mod repository;
pub mod review;
