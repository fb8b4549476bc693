//! GraphQL transport: token leasing, budget reporting, retry wiring.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::{Value, json};

use crate::partition::{MatchCounter, Partition};
use crate::retry::{self, RetryConfig};
use crate::tokens::TokenPool;

use super::error::GitHubError;
use super::queries;
use super::types::RateLimitEnvelope;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("ghcrawl/", env!("CARGO_PKG_VERSION"));

/// Client for the GraphQL endpoint.
///
/// Every request leases a token from the pool for that single attempt and
/// reports the token's remaining budget back from the response envelope (or
/// the `x-ratelimit-*` headers when the envelope is absent). Rate-limit
/// rejections mark the leased token exhausted before surfacing, so the retry
/// executor's next attempt rotates to a different token.
pub struct GraphqlClient {
    http: reqwest::Client,
    api_url: String,
    pool: Arc<TokenPool>,
    retry: RetryConfig,
}

impl GraphqlClient {
    /// Build a client against the given endpoint.
    pub fn new(
        api_url: impl Into<String>,
        pool: Arc<TokenPool>,
        retry: RetryConfig,
    ) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            pool,
            retry,
        })
    }

    /// Token pool backing this client.
    pub fn pool(&self) -> &Arc<TokenPool> {
        &self.pool
    }

    /// Issue one GraphQL document with retry on transient failures.
    ///
    /// Returns the `data` object of the response.
    pub async fn request(&self, document: &str, variables: Value) -> Result<Value, GitHubError> {
        retry::execute(&self.retry, || self.post_once(document, &variables)).await
    }

    /// Single attempt: lease a token, post, classify, report budget.
    async fn post_once(&self, document: &str, variables: &Value) -> Result<Value, GitHubError> {
        let lease = self.pool.acquire().await;

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&lease.token)
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let header_budget = header_budget(response.headers());

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = header_budget
                .map(|(_, reset_at)| reset_at)
                .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(60));
            self.pool.mark_exhausted(lease.slot, Some(reset_at));
            return Err(GitHubError::RateLimited { reset_at });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::Status { status, body });
        }

        let body: Value = response.json().await?;

        if let Some(errors) = body
            .get("errors")
            .and_then(Value::as_array)
            .filter(|a| !a.is_empty())
        {
            // The GraphQL API reports point exhaustion as an in-band error
            // with a 200 status.
            if errors
                .iter()
                .any(|e| e.get("type").and_then(Value::as_str) == Some("RATE_LIMITED"))
            {
                let reset_at = header_budget
                    .map(|(_, reset_at)| reset_at)
                    .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(60));
                self.pool.mark_exhausted(lease.slot, Some(reset_at));
                return Err(GitHubError::RateLimited { reset_at });
            }

            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            return Err(GitHubError::Query(messages.join("; ")));
        }

        let data = body
            .get("data")
            .filter(|d| !d.is_null())
            .cloned()
            .ok_or_else(|| GitHubError::Decode("response carries no data object".into()))?;

        match data
            .get("rateLimit")
            .map(|v| serde_json::from_value::<RateLimitEnvelope>(v.clone()))
        {
            Some(Ok(envelope)) => {
                self.pool
                    .report(lease.slot, envelope.remaining, envelope.reset_at);
            }
            _ => {
                if let Some((remaining, reset_at)) = header_budget {
                    self.pool.report(lease.slot, remaining, reset_at);
                }
            }
        }

        Ok(data)
    }
}

#[async_trait::async_trait]
impl MatchCounter for GraphqlClient {
    async fn count_matches(&self, partition: &Partition) -> Result<u64, GitHubError> {
        let data = self
            .request(
                queries::SEARCH_REPOSITORY_COUNT,
                json!({ "query": partition.search_query() }),
            )
            .await?;

        data.pointer("/search/repositoryCount")
            .and_then(Value::as_u64)
            .ok_or_else(|| GitHubError::Decode("search count response missing repositoryCount".into()))
    }
}

/// Extract `(remaining, reset_at)` from the REST-style rate-limit headers,
/// used as a fallback when a response carries no GraphQL envelope.
fn header_budget(headers: &HeaderMap) -> Option<(u32, DateTime<Utc>)> {
    let remaining = headers
        .get("x-ratelimit-remaining")?
        .to_str()
        .ok()?
        .parse()
        .ok()?;
    let reset = headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .parse()
        .ok()?;
    Some((remaining, DateTime::from_timestamp(reset, 0)?))
}
