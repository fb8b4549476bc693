//! GitHub API error types and retryable/fatal classification.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the GraphQL endpoint.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Transport-level failure (connect, timeout, reset, body decode).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status other than a rate-limit rejection.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Rate limit exceeded on the token that made the request.
    #[error("rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// The server rejected the query itself. Not retryable: resending the
    /// same document cannot succeed.
    #[error("GraphQL query rejected: {0}")]
    Query(String),

    /// Response arrived but its shape was not what the query asked for.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl GitHubError {
    /// Whether the retry executor should re-attempt the operation.
    ///
    /// Transient transport failures, 5xx responses and rate-limit rejections
    /// are retryable; the rate-limited token is marked exhausted before the
    /// error surfaces, so the retry leases a different token. Everything else
    /// is fatal for the unit of work.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::RateLimited { .. } => true,
            Self::Query(_) | Self::Decode(_) => false,
        }
    }
}
