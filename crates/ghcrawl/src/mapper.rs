//! Per-record validation of raw GraphQL nodes into domain records.
//!
//! Validation is deliberately per record, not per page: one malformed node
//! is logged and counted, the rest of the page proceeds. The API does emit
//! the occasional node with a null field it declares non-null, and losing a
//! 50-record page to one of them is the wrong trade.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::model::{
    CiCheckRecord, CommentParent, CommentRecord, IssueRecord, PullRequestRecord, RepoRecord,
    ReviewRecord,
};

/// A raw node that failed validation.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("record missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` holds invalid timestamp `{value}`")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("field `{field}` holds {found} where {expected} was expected")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn required<'a>(raw: &'a Value, field: &'static str) -> Result<&'a Value, MapError> {
    match raw.get(field) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(MapError::MissingField { field }),
    }
}

fn string_field(raw: &Value, field: &'static str) -> Result<String, MapError> {
    let value = required(raw, field)?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| MapError::WrongType {
            field,
            expected: "a string",
            found: type_name(value),
        })
}

fn int_field(raw: &Value, field: &'static str) -> Result<i32, MapError> {
    let value = required(raw, field)?;
    value
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| MapError::WrongType {
            field,
            expected: "an integer",
            found: type_name(value),
        })
}

fn timestamp_field(raw: &Value, field: &'static str) -> Result<DateTime<Utc>, MapError> {
    let text = string_field(raw, field)?;
    text.parse::<DateTime<Utc>>()
        .map_err(|_| MapError::InvalidTimestamp { field, value: text })
}

/// Map one repository node from a search connection.
pub fn map_repository(raw: &Value) -> Result<RepoRecord, MapError> {
    Ok(RepoRecord {
        id: string_field(raw, "id")?,
        name: string_field(raw, "nameWithOwner")?,
        star_count: int_field(raw, "stargazerCount")?,
        updated_at: timestamp_field(raw, "updatedAt")?,
    })
}

pub fn map_issue(raw: &Value, repository_id: &str) -> Result<IssueRecord, MapError> {
    Ok(IssueRecord {
        id: string_field(raw, "id")?,
        repository_id: repository_id.to_owned(),
        number: int_field(raw, "number")?,
        title: string_field(raw, "title")?,
        created_at: timestamp_field(raw, "createdAt")?,
    })
}

pub fn map_pull_request(raw: &Value, repository_id: &str) -> Result<PullRequestRecord, MapError> {
    Ok(PullRequestRecord {
        id: string_field(raw, "id")?,
        repository_id: repository_id.to_owned(),
        number: int_field(raw, "number")?,
        title: string_field(raw, "title")?,
        created_at: timestamp_field(raw, "createdAt")?,
    })
}

/// Map one comment node under the given parent.
pub fn map_comment(raw: &Value, parent: &CommentParent) -> Result<CommentRecord, MapError> {
    Ok(CommentRecord {
        id: string_field(raw, "id")?,
        parent: parent.clone(),
        body: string_field(raw, "body")?,
        created_at: timestamp_field(raw, "createdAt")?,
    })
}

pub fn map_review(raw: &Value, pull_request_id: &str) -> Result<ReviewRecord, MapError> {
    Ok(ReviewRecord {
        id: string_field(raw, "id")?,
        pull_request_id: pull_request_id.to_owned(),
        body: string_field(raw, "body")?,
        created_at: timestamp_field(raw, "createdAt")?,
    })
}

/// Map one check-run node. Check runs carry `startedAt`/`completedAt` rather
/// than `createdAt`; the start time wins, the completion time stands in for
/// runs the platform never recorded a start for.
pub fn map_ci_check(raw: &Value, pull_request_id: &str) -> Result<CiCheckRecord, MapError> {
    let created_at = match timestamp_field(raw, "startedAt") {
        Ok(started) => started,
        Err(MapError::MissingField { .. }) => timestamp_field(raw, "completedAt")?,
        Err(err) => return Err(err),
    };

    Ok(CiCheckRecord {
        id: string_field(raw, "id")?,
        pull_request_id: pull_request_id.to_owned(),
        name: string_field(raw, "name")?,
        created_at,
    })
}

/// Run one mapping over every node of a page, collecting the survivors and
/// the failures separately.
pub fn map_page<T>(
    nodes: &[Value],
    mut map: impl FnMut(&Value) -> Result<T, MapError>,
) -> (Vec<T>, Vec<MapError>) {
    let mut records = Vec::with_capacity(nodes.len());
    let mut failures = Vec::new();

    for node in nodes {
        match map(node) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed record");
                failures.push(err);
            }
        }
    }

    (records, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_node(id: u32) -> Value {
        json!({
            "id": format!("I_{id}"),
            "number": id,
            "title": format!("issue {id}"),
            "createdAt": "2024-03-01T12:00:00Z"
        })
    }

    #[test]
    fn repository_node_maps_cleanly() {
        let raw = json!({
            "id": "R_kgDOabc",
            "nameWithOwner": "rust-lang/rust",
            "stargazerCount": 95000,
            "createdAt": "2010-06-16T20:39:03Z",
            "updatedAt": "2026-08-01T09:30:00Z"
        });

        let record = map_repository(&raw).expect("should map");
        assert_eq!(record.id, "R_kgDOabc");
        assert_eq!(record.name, "rust-lang/rust");
        assert_eq!(record.star_count, 95000);
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let raw = json!({ "id": "R_1", "stargazerCount": 5 });
        let err = map_repository(&raw).expect_err("nameWithOwner absent");
        assert!(matches!(
            err,
            MapError::MissingField {
                field: "nameWithOwner"
            }
        ));
    }

    #[test]
    fn explicit_null_counts_as_missing() {
        let mut raw = issue_node(7);
        raw["title"] = Value::Null;
        let err = map_issue(&raw, "R_1").expect_err("null title");
        assert!(matches!(err, MapError::MissingField { field: "title" }));
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        let mut raw = issue_node(7);
        raw["createdAt"] = json!("not-a-date");
        let err = map_issue(&raw, "R_1").expect_err("bad timestamp");
        assert!(matches!(
            err,
            MapError::InvalidTimestamp {
                field: "createdAt",
                ..
            }
        ));
    }

    #[test]
    fn comment_keeps_its_parent_variant() {
        let raw = json!({
            "id": "IC_1",
            "body": "looks good",
            "createdAt": "2024-03-02T08:00:00Z"
        });

        let record = map_comment(&raw, &CommentParent::PullRequest("PR_9".into()))
            .expect("should map");
        assert_eq!(record.parent, CommentParent::PullRequest("PR_9".into()));
    }

    #[test]
    fn check_run_falls_back_to_completion_time() {
        let raw = json!({
            "id": "CR_1",
            "name": "ci/test",
            "startedAt": null,
            "completedAt": "2024-03-02T09:10:00Z"
        });

        let record = map_ci_check(&raw, "PR_9").expect("should map");
        assert_eq!(
            record.created_at,
            "2024-03-02T09:10:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn one_malformed_record_does_not_sink_the_page() {
        let mut nodes: Vec<Value> = (0..50).map(issue_node).collect();
        nodes[17] = json!({ "id": "I_bad", "number": "seventeen" });

        let (records, failures) = map_page(&nodes, |n| map_issue(n, "R_1"));

        assert_eq!(records.len(), 49);
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            MapError::WrongType {
                field: "number",
                ..
            }
        ));
    }
}
