//! Domain record to active model conversions.
//!
//! The tagged [`CommentParent`] variant is flattened into the nullable
//! column pair here and nowhere else.

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;

use crate::entity::{ci_check, comment, issue, pull_request, repository, review};
use crate::model::{
    CiCheckRecord, CommentParent, CommentRecord, IssueRecord, PullRequestRecord, RepoRecord,
    ReviewRecord,
};

/// The repository row carries the crawl watermark, so conversion needs the
/// commit timestamp alongside the record.
pub(crate) fn repository_model(
    record: &RepoRecord,
    crawled_at: DateTime<Utc>,
) -> repository::ActiveModel {
    repository::ActiveModel {
        id: Set(record.id.clone()),
        name: Set(record.name.clone()),
        star_count: Set(record.star_count),
        updated_at: Set(record.updated_at),
        last_crawled_at: Set(crawled_at),
    }
}

pub(crate) fn issue_model(record: &IssueRecord) -> issue::ActiveModel {
    issue::ActiveModel {
        id: Set(record.id.clone()),
        repository_id: Set(record.repository_id.clone()),
        number: Set(record.number),
        title: Set(record.title.clone()),
        created_at: Set(record.created_at),
    }
}

pub(crate) fn pull_request_model(record: &PullRequestRecord) -> pull_request::ActiveModel {
    pull_request::ActiveModel {
        id: Set(record.id.clone()),
        repository_id: Set(record.repository_id.clone()),
        number: Set(record.number),
        title: Set(record.title.clone()),
        created_at: Set(record.created_at),
    }
}

pub(crate) fn comment_model(record: &CommentRecord) -> comment::ActiveModel {
    let (issue_id, pull_request_id) = match &record.parent {
        CommentParent::Issue(id) => (Some(id.clone()), None),
        CommentParent::PullRequest(id) => (None, Some(id.clone())),
    };

    comment::ActiveModel {
        id: Set(record.id.clone()),
        issue_id: Set(issue_id),
        pull_request_id: Set(pull_request_id),
        body: Set(record.body.clone()),
        created_at: Set(record.created_at),
    }
}

pub(crate) fn review_model(record: &ReviewRecord) -> review::ActiveModel {
    review::ActiveModel {
        id: Set(record.id.clone()),
        pull_request_id: Set(record.pull_request_id.clone()),
        body: Set(record.body.clone()),
        created_at: Set(record.created_at),
    }
}

pub(crate) fn ci_check_model(record: &CiCheckRecord) -> ci_check::ActiveModel {
    ci_check::ActiveModel {
        id: Set(record.id.clone()),
        pull_request_id: Set(record.pull_request_id.clone()),
        name: Set(record.name.clone()),
        created_at: Set(record.created_at),
    }
}
