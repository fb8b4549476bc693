//! Crawl run orchestration: partition planning, repository assignment,
//! worker fan-out, summary accounting.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::github::{ConnectionCursor, ConnectionSpec, GraphqlClient};
use crate::mapper;
use crate::model::RepoRecord;
use crate::partition::{Partition, PartitionPlanner};

use super::progress::{CrawlProgress, ProgressCallback, emit};
use super::types::{CrawlError, CrawlOptions, CrawlSummary, FailedRepo};
use super::worker::{self, WorkerStats};

/// One worker's outcome, keyed by the repository it ran for.
type WorkerOutcome = (String, String, Result<WorkerStats, CrawlError>);

/// Drives a whole crawl run.
///
/// The coordinator walks the partition planner's leaves, pages through each
/// leaf's search results, and hands every new repository to a worker task.
/// Worker concurrency is capped at the token pool size by default since each
/// in-flight request holds one token lease. Every failure below the run
/// level is absorbed into the summary; the run itself does not fail.
pub struct Crawler {
    client: Arc<GraphqlClient>,
    db: Arc<DatabaseConnection>,
    options: CrawlOptions,
}

impl Crawler {
    pub fn new(
        client: Arc<GraphqlClient>,
        db: Arc<DatabaseConnection>,
        options: CrawlOptions,
    ) -> Self {
        Self {
            client,
            db,
            options,
        }
    }

    /// Run the crawl to completion, budget exhaustion, or shutdown.
    ///
    /// `shutdown` is polled between pages and between repository
    /// assignments; once set, no new work starts and in-flight workers are
    /// drained before returning.
    pub async fn run(
        &self,
        shutdown: Arc<AtomicBool>,
        on_progress: Option<ProgressCallback>,
    ) -> CrawlSummary {
        let progress: Option<Arc<ProgressCallback>> = on_progress.map(Arc::new);

        let root = Partition::root(
            self.options.min_stars,
            self.options.start_date(),
            Utc::now().date_naive(),
        );
        let mut planner = PartitionPlanner::new(root, self.options.partition_threshold);

        let workers = self
            .options
            .concurrency
            .unwrap_or_else(|| self.client.pool().len())
            .max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut join_set: JoinSet<WorkerOutcome> = JoinSet::new();

        let mut seen: HashSet<String> = HashSet::new();
        let mut remaining = self.options.total_num_repo;
        let mut summary = CrawlSummary::default();

        tracing::info!(
            budget = self.options.total_num_repo,
            workers,
            min_stars = self.options.min_stars,
            "starting crawl"
        );

        'partitions: while remaining > 0 && !shutdown.load(Ordering::Relaxed) {
            let Some((leaf, matches)) = planner.next_leaf(self.client.as_ref()).await else {
                break;
            };
            summary.partitions += 1;
            let query = leaf.search_query();
            emit(
                progress.as_deref(),
                CrawlProgress::PartitionReady {
                    query: query.clone(),
                    matches,
                },
            );

            let mut cursor = ConnectionCursor::new(ConnectionSpec::search_repositories(
                &query,
                self.options.batch_size,
            ));

            loop {
                if shutdown.load(Ordering::Relaxed) {
                    break 'partitions;
                }

                let page = match cursor.next_page(&self.client).await {
                    Ok(Some(page)) => page,
                    Ok(None) => break,
                    Err(err) => {
                        // The page already went through the retry executor;
                        // give up on the rest of this partition only.
                        tracing::warn!(query = %query, error = %err, "abandoning partition traversal");
                        summary.skipped_partitions += 1;
                        emit(
                            progress.as_deref(),
                            CrawlProgress::PartitionSkipped {
                                query: query.clone(),
                                error: err.to_string(),
                            },
                        );
                        break;
                    }
                };

                let (repos, failures) = mapper::map_page(&page.nodes, mapper::map_repository);
                summary.malformed_records += failures.len();

                for repo in repos {
                    if shutdown.load(Ordering::Relaxed) {
                        break 'partitions;
                    }
                    if remaining == 0 {
                        break 'partitions;
                    }
                    // Partitions are disjoint, but a repository can still
                    // show up twice when the index shifts under the crawl.
                    if !seen.insert(repo.id.clone()) {
                        continue;
                    }

                    remaining -= 1;
                    emit(
                        progress.as_deref(),
                        CrawlProgress::RepositoryAssigned {
                            name: repo.name.clone(),
                            assigned_so_far: self.options.total_num_repo - remaining,
                            total: self.options.total_num_repo,
                        },
                    );

                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                        break 'partitions;
                    };
                    self.spawn_worker(&mut join_set, permit, repo, progress.clone());

                    while let Some(outcome) = join_set.try_join_next() {
                        absorb(&mut summary, progress.as_deref(), outcome);
                    }
                }
            }
        }

        while let Some(outcome) = join_set.join_next().await {
            absorb(&mut summary, progress.as_deref(), outcome);
        }

        summary.interrupted = shutdown.load(Ordering::Relaxed);
        summary.skipped_partitions += planner.skipped();

        emit(
            progress.as_deref(),
            CrawlProgress::Finished {
                crawled: summary.crawled,
                failed: summary.failed.len(),
                interrupted: summary.interrupted,
            },
        );
        tracing::info!(
            crawled = summary.crawled,
            failed = summary.failed.len(),
            partitions = summary.partitions,
            skipped_partitions = summary.skipped_partitions,
            malformed = summary.malformed_records,
            interrupted = summary.interrupted,
            "crawl finished"
        );

        summary
    }

    fn spawn_worker(
        &self,
        join_set: &mut JoinSet<WorkerOutcome>,
        permit: tokio::sync::OwnedSemaphorePermit,
        repo: RepoRecord,
        progress: Option<Arc<ProgressCallback>>,
    ) {
        let client = Arc::clone(&self.client);
        let db = Arc::clone(&self.db);
        let batch_size = self.options.batch_size;

        join_set.spawn(async move {
            let _permit = permit;
            let id = repo.id.clone();
            let name = repo.name.clone();
            let result =
                worker::crawl_repository(&client, &db, batch_size, repo, progress.as_deref())
                    .await;
            (id, name, result)
        });
    }
}

fn absorb(
    summary: &mut CrawlSummary,
    on_progress: Option<&ProgressCallback>,
    outcome: Result<WorkerOutcome, JoinError>,
) {
    match outcome {
        Ok((_, name, Ok(stats))) => {
            summary.crawled += 1;
            summary.malformed_records += stats.malformed;
            emit(
                on_progress,
                CrawlProgress::RepositoryDone {
                    name,
                    records: stats.records,
                },
            );
        }
        Ok((id, name, Err(err))) => {
            tracing::warn!(repo = %name, error = %err, "repository crawl failed");
            emit(
                on_progress,
                CrawlProgress::RepositoryFailed {
                    name: name.clone(),
                    error: err.to_string(),
                },
            );
            summary.failed.push(FailedRepo {
                id,
                name,
                error: err.to_string(),
            });
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "repository worker panicked");
            summary.failed.push(FailedRepo {
                id: String::new(),
                name: String::new(),
                error: join_err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::crawl::testutil::{mount_empty_sub_entities, test_client, test_db};
    use crate::entity::prelude::*;
    use sea_orm::EntityTrait;

    fn repo_node(id: u32, stars: u32) -> serde_json::Value {
        json!({
            "id": format!("R_{id}"),
            "nameWithOwner": format!("owner/repo{id}"),
            "stargazerCount": stars,
            "createdAt": "2024-02-01T00:00:00Z",
            "updatedAt": "2026-08-01T00:00:00Z"
        })
    }

    async fn mount_search(server: &MockServer, nodes: Vec<serde_json::Value>) {
        let count = nodes.len();
        Mock::given(method("POST"))
            .and(body_string_contains("SearchRepositoryCount"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "search": { "repositoryCount": count } }
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("SearchRepositories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "search": {
                    "repositoryCount": count,
                    "pageInfo": { "hasNextPage": false, "endCursor": "end" },
                    "nodes": nodes
                } }
            })))
            .mount(server)
            .await;
    }

    fn crawler(server_url: &str, options: CrawlOptions, db: Arc<DatabaseConnection>) -> Crawler {
        let client = Arc::new(test_client(server_url, vec!["t1".into(), "t2".into()]));
        Crawler::new(client, db, options)
    }

    #[tokio::test]
    async fn run_crawls_every_repository_in_the_search_space() {
        let server = MockServer::start().await;
        mount_search(&server, vec![repo_node(1, 150), repo_node(2, 300)]).await;
        mount_empty_sub_entities(&server).await;

        let db = Arc::new(test_db().await);
        let summary = crawler(&server.uri(), CrawlOptions::default(), Arc::clone(&db))
            .run(Arc::new(AtomicBool::new(false)), None)
            .await;

        assert_eq!(summary.crawled, 2);
        assert!(summary.failed.is_empty());
        assert_eq!(summary.partitions, 1);
        assert!(!summary.interrupted);
        assert_eq!(Repository::find().all(db.as_ref()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn assignment_budget_caps_the_run() {
        let server = MockServer::start().await;
        mount_search(&server, vec![repo_node(1, 150), repo_node(2, 300)]).await;
        mount_empty_sub_entities(&server).await;

        let db = Arc::new(test_db().await);
        let options = CrawlOptions {
            total_num_repo: 1,
            ..CrawlOptions::default()
        };
        let summary = crawler(&server.uri(), options, Arc::clone(&db))
            .run(Arc::new(AtomicBool::new(false)), None)
            .await;

        assert_eq!(summary.crawled, 1);
        assert_eq!(Repository::find().all(db.as_ref()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_failing_repository_does_not_stop_the_run() {
        let server = MockServer::start().await;
        mount_search(&server, vec![repo_node(1, 150), repo_node(2, 300)]).await;
        // Repo 1's issue traversal never recovers; everything else is fine.
        Mock::given(method("POST"))
            .and(body_string_contains("RepositoryIssues"))
            .and(body_string_contains("R_1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_empty_sub_entities(&server).await;

        let db = Arc::new(test_db().await);
        let options = CrawlOptions {
            concurrency: Some(1),
            ..CrawlOptions::default()
        };
        let summary = crawler(&server.uri(), options, Arc::clone(&db))
            .run(Arc::new(AtomicBool::new(false)), None)
            .await;

        assert_eq!(summary.crawled, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].id, "R_1");
        assert_eq!(Repository::find().all(db.as_ref()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_request_stops_the_run_before_new_work() {
        let server = MockServer::start().await;

        let db = Arc::new(test_db().await);
        let summary = crawler(&server.uri(), CrawlOptions::default(), db)
            .run(Arc::new(AtomicBool::new(true)), None)
            .await;

        assert!(summary.interrupted);
        assert_eq!(summary.crawled, 0);
        assert!(
            server.received_requests().await.unwrap().is_empty(),
            "no request may be issued after shutdown"
        );
    }

    #[tokio::test]
    async fn progress_events_track_the_run() {
        use std::sync::Mutex;

        let server = MockServer::start().await;
        mount_search(&server, vec![repo_node(1, 150)]).await;
        mount_empty_sub_entities(&server).await;

        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            let label = match event {
                CrawlProgress::PartitionReady { .. } => "partition",
                CrawlProgress::RepositoryAssigned { .. } => "assigned",
                CrawlProgress::RepositoryDone { .. } => "done",
                CrawlProgress::Finished { .. } => "finished",
                _ => return,
            };
            sink.lock().unwrap().push(label.to_string());
        });

        let db = Arc::new(test_db().await);
        crawler(&server.uri(), CrawlOptions::default(), db)
            .run(Arc::new(AtomicBool::new(false)), Some(callback))
            .await;

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["partition", "assigned", "done", "finished"],
            "events out of order"
        );
    }
}
