//! Per-repository worker: drain every sub-entity connection, then commit
//! the whole harvest in one transaction.

use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde_json::Value;

use crate::github::{ConnectionCursor, ConnectionSpec, GraphqlClient};
use crate::mapper::{self, MapError};
use crate::model::{CommentParent, RepoBatch, RepoRecord};
use crate::store;

use super::progress::{CrawlProgress, ProgressCallback, emit};
use super::types::{CrawlError, RepoState, SubEntityKind};

/// What one worker produced.
#[derive(Debug)]
pub(crate) struct WorkerStats {
    /// Rows committed for the repository, across every table.
    pub records: usize,
    /// Malformed records dropped during mapping.
    pub malformed: usize,
}

/// Crawl one repository end to end.
///
/// Fetches issues and pull requests first, then the connections keyed off
/// their ids (comments, reviews, CI checks), accumulating everything into
/// one [`RepoBatch`]. Nothing touches the database until every fetch has
/// succeeded; a failure part way through leaves no partial repository
/// behind.
pub(crate) async fn crawl_repository(
    client: &GraphqlClient,
    db: &DatabaseConnection,
    batch_size: u32,
    repo: RepoRecord,
    on_progress: Option<&ProgressCallback>,
) -> Result<WorkerStats, CrawlError> {
    let repo_id = repo.id.clone();
    let name = repo.name.clone();
    let mut batch = RepoBatch::for_repository(repo);
    let mut malformed = 0usize;

    let phase = |state: RepoState| {
        emit(
            on_progress,
            CrawlProgress::RepositoryState {
                name: name.clone(),
                state,
            },
        );
    };

    phase(RepoState::Fetching(SubEntityKind::Issues));
    let (issues, dropped) = drain(client, ConnectionSpec::issues(&repo_id, batch_size), |n| {
        mapper::map_issue(n, &repo_id)
    })
    .await?;
    malformed += dropped;
    batch.issues = issues;

    phase(RepoState::Fetching(SubEntityKind::PullRequests));
    let (pull_requests, dropped) = drain(
        client,
        ConnectionSpec::pull_requests(&repo_id, batch_size),
        |n| mapper::map_pull_request(n, &repo_id),
    )
    .await?;
    malformed += dropped;
    batch.pull_requests = pull_requests;

    phase(RepoState::Fetching(SubEntityKind::Comments));
    for issue in &batch.issues {
        let parent = CommentParent::Issue(issue.id.clone());
        let (comments, dropped) = drain(
            client,
            ConnectionSpec::issue_comments(&issue.id, batch_size),
            |n| mapper::map_comment(n, &parent),
        )
        .await?;
        malformed += dropped;
        batch.comments.extend(comments);
    }
    for pr in &batch.pull_requests {
        let parent = CommentParent::PullRequest(pr.id.clone());
        let (comments, dropped) = drain(
            client,
            ConnectionSpec::pull_request_comments(&pr.id, batch_size),
            |n| mapper::map_comment(n, &parent),
        )
        .await?;
        malformed += dropped;
        batch.comments.extend(comments);
    }

    phase(RepoState::Fetching(SubEntityKind::Reviews));
    for pr in &batch.pull_requests {
        let (reviews, dropped) = drain(
            client,
            ConnectionSpec::reviews(&pr.id, batch_size),
            |n| mapper::map_review(n, &pr.id),
        )
        .await?;
        malformed += dropped;
        batch.reviews.extend(reviews);
    }

    phase(RepoState::Fetching(SubEntityKind::CiChecks));
    for pr in &batch.pull_requests {
        let (checks, dropped) = drain(
            client,
            ConnectionSpec::ci_checks(&pr.id, batch_size),
            |n| mapper::map_ci_check(n, &pr.id),
        )
        .await?;
        malformed += dropped;
        batch.ci_checks.extend(checks);
    }

    if malformed > 0 {
        emit(
            on_progress,
            CrawlProgress::MalformedRecords {
                name: name.clone(),
                count: malformed,
            },
        );
    }

    phase(RepoState::Upserting);
    let records = store::commit_batch(db, &batch, Utc::now()).await? as usize;

    Ok(WorkerStats { records, malformed })
}

/// Walk one connection to the end, mapping as it goes.
async fn drain<T>(
    client: &GraphqlClient,
    spec: ConnectionSpec,
    mut map: impl FnMut(&Value) -> Result<T, MapError>,
) -> Result<(Vec<T>, usize), CrawlError> {
    let mut cursor = ConnectionCursor::new(spec);
    let mut records = Vec::new();
    let mut malformed = 0usize;

    while let Some(page) = cursor.next_page(client).await? {
        let (mapped, failures) = mapper::map_page(&page.nodes, &mut map);
        records.extend(mapped);
        malformed += failures.len();
    }

    Ok((records, malformed))
}

#[cfg(test)]
mod tests {
    use super::*;

    use sea_orm::EntityTrait;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::crawl::testutil::{empty_node_connection, test_client, test_db};
    use crate::entity::prelude::*;

    fn test_repo() -> RepoRecord {
        RepoRecord {
            id: "R_1".into(),
            name: "acme/widget".into(),
            star_count: 321,
            updated_at: Utc::now(),
        }
    }

    /// Mount responses for a repository with one issue (one comment) and one
    /// pull request (one comment, one review, one check run).
    async fn mount_repo_fixture(server: &MockServer) {
        Mock::given(method("POST"))
            .and(body_string_contains("RepositoryIssues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "node": { "issues": {
                    "pageInfo": { "hasNextPage": false, "endCursor": "c1" },
                    "nodes": [{
                        "id": "I_1", "number": 12, "title": "crash on resize",
                        "createdAt": "2024-02-01T00:00:00Z"
                    }]
                } } }
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(body_string_contains("RepositoryPullRequests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "node": { "pullRequests": {
                    "pageInfo": { "hasNextPage": false, "endCursor": "c2" },
                    "nodes": [{
                        "id": "PR_1", "number": 13, "title": "fix resize crash",
                        "createdAt": "2024-02-02T00:00:00Z"
                    }]
                } } }
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(body_string_contains("IssueComments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "node": { "comments": {
                    "pageInfo": { "hasNextPage": false, "endCursor": "c3" },
                    "nodes": [{
                        "id": "IC_1", "body": "repro attached",
                        "createdAt": "2024-02-01T01:00:00Z"
                    }]
                } } }
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(body_string_contains("PullRequestComments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "node": { "comments": {
                    "pageInfo": { "hasNextPage": false, "endCursor": "c4" },
                    "nodes": [{
                        "id": "PC_1", "body": "nice catch",
                        "createdAt": "2024-02-02T01:00:00Z"
                    }]
                } } }
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(body_string_contains("PullRequestReviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "node": { "reviews": {
                    "pageInfo": { "hasNextPage": false, "endCursor": "c5" },
                    "nodes": [{
                        "id": "RV_1", "body": "approved",
                        "createdAt": "2024-02-02T02:00:00Z"
                    }]
                } } }
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(body_string_contains("PullRequestCiChecks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "node": { "commits": { "nodes": [{ "commit": {
                    "statusCheckRollup": { "contexts": {
                        "pageInfo": { "hasNextPage": false, "endCursor": "c6" },
                        "nodes": [{
                            "id": "CR_1", "name": "ci/test",
                            "startedAt": "2024-02-02T03:00:00Z",
                            "completedAt": "2024-02-02T03:05:00Z"
                        }]
                    } }
                } }] } } }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn worker_commits_a_full_repository() {
        let server = MockServer::start().await;
        mount_repo_fixture(&server).await;

        let client = test_client(&server.uri(), vec!["t1".into()]);
        let db = test_db().await;

        let stats = crawl_repository(&client, &db, 50, test_repo(), None)
            .await
            .expect("crawl should succeed");

        // Repo + issue + PR + two comments + review + check.
        assert_eq!(stats.records, 7);
        assert_eq!(stats.malformed, 0);

        assert_eq!(Repository::find().all(&db).await.unwrap().len(), 1);
        assert_eq!(Issue::find().all(&db).await.unwrap().len(), 1);
        assert_eq!(PullRequest::find().all(&db).await.unwrap().len(), 1);
        assert_eq!(Comment::find().all(&db).await.unwrap().len(), 2);
        assert_eq!(Review::find().all(&db).await.unwrap().len(), 1);
        assert_eq!(CiCheck::find().all(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recrawl_converges_instead_of_duplicating() {
        let server = MockServer::start().await;
        mount_repo_fixture(&server).await;

        let client = test_client(&server.uri(), vec!["t1".into()]);
        let db = test_db().await;

        crawl_repository(&client, &db, 50, test_repo(), None)
            .await
            .expect("first crawl");
        crawl_repository(&client, &db, 50, test_repo(), None)
            .await
            .expect("second crawl");

        assert_eq!(Repository::find().all(&db).await.unwrap().len(), 1);
        assert_eq!(Comment::find().all(&db).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_no_partial_repository() {
        let server = MockServer::start().await;
        // Issues resolve, pull requests never do.
        Mock::given(method("POST"))
            .and(body_string_contains("RepositoryIssues"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(empty_node_connection("issues")),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("RepositoryPullRequests"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), vec!["t1".into()]);
        let db = test_db().await;

        crawl_repository(&client, &db, 50, test_repo(), None)
            .await
            .expect_err("exhausted retries should fail the repository");

        assert!(
            Repository::find().all(&db).await.unwrap().is_empty(),
            "nothing may be committed for a failed repository"
        );
    }
}
