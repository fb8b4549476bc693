//! Idempotent batch commit of crawled records.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};

use crate::entity::{ci_check, comment, issue, pull_request, repository, review};
use crate::model::RepoBatch;

use super::convert;
use super::errors::{Result, StoreError};

/// Insert batches in chunks to keep statement size bounded.
const CHUNK_SIZE: usize = 100;

/// Commit one repository's harvest in a single transaction.
///
/// Every table upserts on the platform node id, so re-running a crawl over
/// the same repositories converges instead of duplicating. Writes go parents
/// before children (repository, issues, pull requests, then comments,
/// reviews, checks) to satisfy the foreign keys. Returns the number of rows
/// written.
pub async fn commit_batch(
    db: &DatabaseConnection,
    batch: &RepoBatch,
    crawled_at: DateTime<Utc>,
) -> Result<u64> {
    if batch.record_count() == 0 {
        return Ok(0);
    }

    let txn = db.begin().await.map_err(StoreError::classify)?;

    let mut written = 0u64;

    if let Some(repo) = &batch.repository {
        written += upsert_chunked(
            &txn,
            vec![convert::repository_model(repo, crawled_at)],
            repository_on_conflict(),
        )
        .await?;
    }

    written += upsert_chunked(
        &txn,
        batch.issues.iter().map(convert::issue_model).collect(),
        issue_on_conflict(),
    )
    .await?;

    written += upsert_chunked(
        &txn,
        batch
            .pull_requests
            .iter()
            .map(convert::pull_request_model)
            .collect(),
        pull_request_on_conflict(),
    )
    .await?;

    written += upsert_chunked(
        &txn,
        batch.comments.iter().map(convert::comment_model).collect(),
        comment_on_conflict(),
    )
    .await?;

    written += upsert_chunked(
        &txn,
        batch.reviews.iter().map(convert::review_model).collect(),
        review_on_conflict(),
    )
    .await?;

    written += upsert_chunked(
        &txn,
        batch
            .ci_checks
            .iter()
            .map(convert::ci_check_model)
            .collect(),
        ci_check_on_conflict(),
    )
    .await?;

    txn.commit().await.map_err(StoreError::classify)?;

    tracing::debug!(rows = written, "committed repository batch");
    Ok(written)
}

async fn upsert_chunked<C, A>(conn: &C, models: Vec<A>, on_conflict: OnConflict) -> Result<u64>
where
    C: ConnectionTrait,
    A: sea_orm::ActiveModelTrait + Send,
    <A::Entity as EntityTrait>::Model: sea_orm::IntoActiveModel<A>,
{
    if models.is_empty() {
        return Ok(0);
    }

    let count = models.len() as u64;
    let mut models = models;
    while !models.is_empty() {
        let rest = models.split_off(models.len().min(CHUNK_SIZE));
        <A::Entity as EntityTrait>::insert_many(models)
            .on_conflict(on_conflict.clone())
            .exec_without_returning(conn)
            .await
            .map_err(StoreError::classify)?;
        models = rest;
    }

    Ok(count)
}

fn repository_on_conflict() -> OnConflict {
    OnConflict::column(repository::Column::Id)
        .update_columns([
            repository::Column::Name,
            repository::Column::StarCount,
            repository::Column::UpdatedAt,
            repository::Column::LastCrawledAt,
        ])
        .to_owned()
}

fn issue_on_conflict() -> OnConflict {
    OnConflict::column(issue::Column::Id)
        .update_columns([
            issue::Column::RepositoryId,
            issue::Column::Number,
            issue::Column::Title,
            issue::Column::CreatedAt,
        ])
        .to_owned()
}

fn pull_request_on_conflict() -> OnConflict {
    OnConflict::column(pull_request::Column::Id)
        .update_columns([
            pull_request::Column::RepositoryId,
            pull_request::Column::Number,
            pull_request::Column::Title,
            pull_request::Column::CreatedAt,
        ])
        .to_owned()
}

fn comment_on_conflict() -> OnConflict {
    OnConflict::column(comment::Column::Id)
        .update_columns([
            comment::Column::IssueId,
            comment::Column::PullRequestId,
            comment::Column::Body,
            comment::Column::CreatedAt,
        ])
        .to_owned()
}

fn review_on_conflict() -> OnConflict {
    OnConflict::column(review::Column::Id)
        .update_columns([
            review::Column::PullRequestId,
            review::Column::Body,
            review::Column::CreatedAt,
        ])
        .to_owned()
}

fn ci_check_on_conflict() -> OnConflict {
    OnConflict::column(ci_check::Column::Id)
        .update_columns([
            ci_check::Column::PullRequestId,
            ci_check::Column::Name,
            ci_check::Column::CreatedAt,
        ])
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use crate::model::{
        CiCheckRecord, CommentParent, CommentRecord, IssueRecord, PullRequestRecord, RepoRecord,
        ReviewRecord,
    };

    fn full_batch() -> RepoBatch {
        let now = Utc::now();
        RepoBatch {
            repository: Some(RepoRecord {
                id: "R_1".into(),
                name: "a/b".into(),
                star_count: 120,
                updated_at: now,
            }),
            issues: vec![IssueRecord {
                id: "I_1".into(),
                repository_id: "R_1".into(),
                number: 1,
                title: "issue".into(),
                created_at: now,
            }],
            pull_requests: vec![PullRequestRecord {
                id: "PR_1".into(),
                repository_id: "R_1".into(),
                number: 2,
                title: "pr".into(),
                created_at: now,
            }],
            comments: vec![CommentRecord {
                id: "IC_1".into(),
                parent: CommentParent::Issue("I_1".into()),
                body: "c".into(),
                created_at: now,
            }],
            reviews: vec![ReviewRecord {
                id: "RV_1".into(),
                pull_request_id: "PR_1".into(),
                body: "r".into(),
                created_at: now,
            }],
            ci_checks: vec![CiCheckRecord {
                id: "CR_1".into(),
                pull_request_id: "PR_1".into(),
                name: "ci".into(),
                created_at: now,
            }],
        }
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let written = commit_batch(&db, &RepoBatch::default(), Utc::now())
            .await
            .expect("empty commit should succeed");

        assert_eq!(written, 0);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn full_batch_writes_parents_before_children() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results(vec![exec_ok(); 6])
            .into_connection();

        let written = commit_batch(&db, &full_batch(), Utc::now())
            .await
            .expect("commit should succeed");
        assert_eq!(written, 6);

        // One transaction wrapping six upserts, parents first.
        let log = format!("{:?}", db.into_transaction_log());
        let order = [
            "repositories",
            "issues",
            "pull_requests",
            "comments",
            "reviews",
            "ci_checks",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|table| log.find(table).unwrap_or_else(|| panic!("{table} missing")))
            .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "tables written out of order: {log}"
        );
        assert!(log.contains("ON CONFLICT"), "upserts must be idempotent");
    }

    #[tokio::test]
    async fn constraint_failure_surfaces_as_constraint_error() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors(vec![sea_orm::DbErr::Exec(sea_orm::RuntimeErr::Internal(
                "FOREIGN KEY constraint failed".into(),
            ))])
            .into_connection();

        let mut batch = RepoBatch::default();
        batch.issues.push(IssueRecord {
            id: "I_orphan".into(),
            repository_id: "R_missing".into(),
            number: 1,
            title: "orphan".into(),
            created_at: Utc::now(),
        });

        let err = commit_batch(&db, &batch, Utc::now())
            .await
            .expect_err("foreign key violation should surface");
        assert!(matches!(err, StoreError::Constraint { .. }));
    }
}
