//! GitHub GraphQL response shapes shared across the client and paginator.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Cursor state of a connection, straight from `pageInfo`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// The rate-limit envelope every query selects alongside its data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitEnvelope {
    /// Point cost of the query that produced this envelope.
    pub cost: u32,
    /// Points remaining for the token in the current window.
    pub remaining: u32,
    /// When the token's window resets.
    pub reset_at: DateTime<Utc>,
}

/// One page of raw records from a paginated connection.
///
/// Nodes stay as raw JSON; typing and validation happen per record in the
/// entity mapper so one malformed record cannot sink the page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Raw entity records, in the API's native order.
    pub nodes: Vec<Value>,
    /// Continuation cursor, if the connection reported one.
    pub end_cursor: Option<String>,
    /// Whether another page exists after this one.
    pub has_next: bool,
    /// Total match count, reported by search connections only.
    pub total_count: Option<u64>,
}
