//! GitHub GraphQL API integration.
//!
//! The crawler speaks to a single GraphQL endpoint with exactly seven
//! documents (six entity connections plus a count-only search). There is no
//! general-purpose GraphQL client here; [`client::GraphqlClient`] posts the
//! documents in [`queries`] and [`pagination::ConnectionCursor`] walks the
//! cursors.

pub mod client;
pub mod error;
pub mod pagination;
pub mod queries;
pub mod types;

pub use client::GraphqlClient;
pub use error::GitHubError;
pub use pagination::{ConnectionCursor, ConnectionSpec};
pub use types::{Page, PageInfo, RateLimitEnvelope};
