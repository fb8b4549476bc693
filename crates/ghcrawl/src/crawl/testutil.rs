//! Shared fixtures for crawl tests: an in-memory database with the real
//! schema and a client wired for fast retries.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::github::GraphqlClient;
use crate::retry::RetryConfig;
use crate::tokens::TokenPool;

/// Schema for in-memory test databases, matching the migration.
const TEST_SCHEMA: &str = r#"
    CREATE TABLE repositories (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        star_count INTEGER NOT NULL,
        updated_at TEXT NOT NULL,
        last_crawled_at TEXT NOT NULL
    );
    CREATE TABLE issues (
        id TEXT PRIMARY KEY NOT NULL,
        repository_id TEXT NOT NULL REFERENCES repositories (id),
        number INTEGER NOT NULL,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (repository_id, number)
    );
    CREATE TABLE pull_requests (
        id TEXT PRIMARY KEY NOT NULL,
        repository_id TEXT NOT NULL REFERENCES repositories (id),
        number INTEGER NOT NULL,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (repository_id, number)
    );
    CREATE TABLE comments (
        id TEXT PRIMARY KEY NOT NULL,
        issue_id TEXT REFERENCES issues (id),
        pull_request_id TEXT REFERENCES pull_requests (id),
        body TEXT NOT NULL,
        created_at TEXT NOT NULL,
        CHECK (issue_id IS NOT NULL OR pull_request_id IS NOT NULL)
    );
    CREATE TABLE reviews (
        id TEXT PRIMARY KEY NOT NULL,
        pull_request_id TEXT NOT NULL REFERENCES pull_requests (id),
        body TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE ci_checks (
        id TEXT PRIMARY KEY NOT NULL,
        pull_request_id TEXT NOT NULL REFERENCES pull_requests (id),
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
"#;

pub(crate) async fn test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    db.execute_unprepared(TEST_SCHEMA)
        .await
        .expect("schema creation");
    db
}

pub(crate) fn test_client(server_url: &str, tokens: Vec<String>) -> GraphqlClient {
    let pool = Arc::new(TokenPool::new(tokens));
    let retry = RetryConfig {
        min_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        max_retries: 2,
        with_jitter: false,
    };
    GraphqlClient::new(server_url.to_string(), pool, retry).expect("client should build")
}

/// A `node`-rooted connection with no records.
pub(crate) fn empty_node_connection(field: &str) -> Value {
    json!({
        "data": {
            "node": {
                field: {
                    "pageInfo": { "hasNextPage": false, "endCursor": null },
                    "nodes": []
                }
            }
        }
    })
}

/// Mount empty responses for every per-repository connection, so a test can
/// focus on the search traversal.
pub(crate) async fn mount_empty_sub_entities(server: &MockServer) {
    for (operation, field) in [
        ("RepositoryIssues", "issues"),
        ("RepositoryPullRequests", "pullRequests"),
        ("IssueComments", "comments"),
        ("PullRequestComments", "comments"),
        ("PullRequestReviews", "reviews"),
    ] {
        Mock::given(method("POST"))
            .and(body_string_contains(operation))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_node_connection(field)))
            .mount(server)
            .await;
    }

    Mock::given(method("POST"))
        .and(body_string_contains("PullRequestCiChecks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "node": { "commits": { "nodes": [] } } }
        })))
        .mount(server)
        .await;
}
