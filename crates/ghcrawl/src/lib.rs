//! ghcrawl - a GitHub repository metadata crawler.
//!
//! Harvests repositories matching a star/date search space, together with
//! their issues, pull requests, comments, reviews and CI checks, into a
//! relational snapshot. The search space is partitioned to defeat the API's
//! 1000-result window, requests multiplex over a pool of tokens, and every
//! write is an idempotent upsert so interrupted runs can simply be re-run.
//!
//! # Features
//!
//! - `migrate` - Enables database migration support. When enabled, you can
//!   use [`connect_and_migrate`] to bring the schema up on connection.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//! use ghcrawl::{Crawler, CrawlOptions, GraphqlClient, TokenPool, connect_and_migrate};
//!
//! let db = Arc::new(connect_and_migrate("sqlite://ghcrawl.db?mode=rwc").await?);
//! let pool = Arc::new(TokenPool::new(tokens));
//! let client = Arc::new(GraphqlClient::new(
//!     "https://api.github.com/graphql",
//!     pool,
//!     Default::default(),
//! )?);
//!
//! let summary = Crawler::new(client, db, CrawlOptions::default())
//!     .run(Arc::new(AtomicBool::new(false)), None)
//!     .await;
//! println!("crawled {} repositories", summary.crawled);
//! ```

pub mod crawl;
pub mod db;
pub mod entity;
pub mod github;
pub mod mapper;
pub mod model;
pub mod partition;
pub mod retry;
pub mod store;
pub mod tokens;

#[cfg(feature = "migrate")]
pub mod migration;

pub use crawl::{CrawlOptions, CrawlProgress, CrawlSummary, Crawler, ProgressCallback};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use github::{GitHubError, GraphqlClient};
pub use retry::RetryConfig;
pub use store::StoreError;
pub use tokens::TokenPool;
