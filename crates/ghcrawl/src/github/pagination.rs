//! Cursor-based traversal of one GraphQL connection.
//!
//! A [`ConnectionSpec`] names the document, its fixed variables and the JSON
//! path to the connection object; a [`ConnectionCursor`] walks the pages one
//! request at a time. Nothing is prefetched: memory stays bounded at one page
//! and the credential pool sees every request.

use serde_json::{Value, json};

use super::client::GraphqlClient;
use super::error::GitHubError;
use super::queries;
use super::types::{Page, PageInfo};

/// The API rejects page sizes above 100.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Description of one paginated connection.
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    document: &'static str,
    variables: Value,
    path: &'static [&'static str],
    page_size: u32,
}

impl ConnectionSpec {
    fn new(
        document: &'static str,
        variables: Value,
        path: &'static [&'static str],
        page_size: u32,
    ) -> Self {
        Self {
            document,
            variables,
            path,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Repositories matching a search query (one partition's traversal).
    pub fn search_repositories(query: &str, page_size: u32) -> Self {
        Self::new(
            queries::SEARCH_REPOSITORIES,
            json!({ "query": query }),
            &["search"],
            page_size,
        )
    }

    /// A repository's issues.
    pub fn issues(repository_id: &str, page_size: u32) -> Self {
        Self::new(
            queries::REPOSITORY_ISSUES,
            json!({ "id": repository_id }),
            &["node", "issues"],
            page_size,
        )
    }

    /// A repository's pull requests.
    pub fn pull_requests(repository_id: &str, page_size: u32) -> Self {
        Self::new(
            queries::REPOSITORY_PULL_REQUESTS,
            json!({ "id": repository_id }),
            &["node", "pullRequests"],
            page_size,
        )
    }

    /// An issue's comments.
    pub fn issue_comments(issue_id: &str, page_size: u32) -> Self {
        Self::new(
            queries::ISSUE_COMMENTS,
            json!({ "id": issue_id }),
            &["node", "comments"],
            page_size,
        )
    }

    /// A pull request's comments.
    pub fn pull_request_comments(pull_request_id: &str, page_size: u32) -> Self {
        Self::new(
            queries::PULL_REQUEST_COMMENTS,
            json!({ "id": pull_request_id }),
            &["node", "comments"],
            page_size,
        )
    }

    /// A pull request's reviews.
    pub fn reviews(pull_request_id: &str, page_size: u32) -> Self {
        Self::new(
            queries::PULL_REQUEST_REVIEWS,
            json!({ "id": pull_request_id }),
            &["node", "reviews"],
            page_size,
        )
    }

    /// CI check runs on a pull request's head commit. The rollup object is
    /// null for commits without CI; that reads as an empty connection.
    pub fn ci_checks(pull_request_id: &str, page_size: u32) -> Self {
        Self::new(
            queries::PULL_REQUEST_CI_CHECKS,
            json!({ "id": pull_request_id }),
            &[
                "node",
                "commits",
                "nodes",
                "0",
                "commit",
                "statusCheckRollup",
                "contexts",
            ],
            page_size,
        )
    }
}

/// Cursor state machine over one connection.
#[derive(Debug)]
pub struct ConnectionCursor {
    spec: ConnectionSpec,
    after: Option<String>,
    exhausted: bool,
}

impl ConnectionCursor {
    /// Start from the beginning of the connection.
    pub fn new(spec: ConnectionSpec) -> Self {
        Self {
            spec,
            after: None,
            exhausted: false,
        }
    }

    /// Resume a previously interrupted traversal from a known cursor.
    pub fn resume(spec: ConnectionSpec, after: Option<String>) -> Self {
        Self {
            spec,
            after,
            exhausted: false,
        }
    }

    /// The continuation cursor reached so far, for resumption.
    pub fn position(&self) -> Option<&str> {
        self.after.as_deref()
    }

    /// Fetch the next page, or `None` once the connection is exhausted.
    ///
    /// Exactly one request per call, through the client's retry executor.
    pub async fn next_page(&mut self, client: &GraphqlClient) -> Result<Option<Page>, GitHubError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut variables = self.spec.variables.clone();
        variables["first"] = json!(self.spec.page_size);
        variables["after"] = match &self.after {
            Some(cursor) => json!(cursor),
            None => Value::Null,
        };

        let data = client.request(self.spec.document, variables).await?;
        let page = parse_connection(&data, self.spec.path)?;

        if page.end_cursor.is_some() {
            self.after = page.end_cursor.clone();
        }
        self.exhausted = !page.has_next;

        Ok(Some(page))
    }
}

/// Pull a [`Page`] out of a response at the given path.
///
/// A null along the path means the parent object does not exist (deleted
/// node, commit without CI) and reads as an empty, exhausted page. A missing
/// key is a malformed response.
pub(crate) fn parse_connection(
    data: &Value,
    path: &[&str],
) -> Result<Page, GitHubError> {
    let mut current = data;
    for segment in path {
        if current.is_null() {
            break;
        }
        let next = match segment.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(segment),
        };
        current = match next {
            Some(value) => value,
            // An index one past the end of an empty array behaves like null.
            None if segment.parse::<usize>().is_ok() => &Value::Null,
            None => {
                return Err(GitHubError::Decode(format!(
                    "response missing `{}` on the way to the connection",
                    segment
                )));
            }
        };
    }

    if current.is_null() {
        return Ok(Page {
            nodes: Vec::new(),
            end_cursor: None,
            has_next: false,
            total_count: None,
        });
    }

    let page_info: PageInfo = current
        .get("pageInfo")
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()
        .map_err(|e| GitHubError::Decode(format!("invalid pageInfo: {e}")))?
        .ok_or_else(|| GitHubError::Decode("connection missing pageInfo".into()))?;

    let nodes = current
        .get("nodes")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter(|n| !n.is_null()).cloned().collect())
        .unwrap_or_default();

    let total_count = current.get("repositoryCount").and_then(Value::as_u64);

    Ok(Page {
        nodes,
        end_cursor: page_info.end_cursor,
        has_next: page_info.has_next_page,
        total_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_search_connection() {
        let data = json!({
            "search": {
                "repositoryCount": 2500,
                "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29yOjUw" },
                "nodes": [
                    { "id": "R_1", "nameWithOwner": "a/b" },
                    null,
                    { "id": "R_2", "nameWithOwner": "c/d" }
                ]
            }
        });

        let page = parse_connection(&data, &["search"]).expect("should parse");
        assert_eq!(page.nodes.len(), 2, "null nodes are dropped");
        assert_eq!(page.end_cursor.as_deref(), Some("Y3Vyc29yOjUw"));
        assert!(page.has_next);
        assert_eq!(page.total_count, Some(2500));
    }

    #[test]
    fn null_node_reads_as_empty_exhausted_page() {
        let data = json!({ "node": null });
        let page = parse_connection(&data, &["node", "issues"]).expect("should parse");
        assert!(page.nodes.is_empty());
        assert!(!page.has_next);
    }

    #[test]
    fn null_status_check_rollup_reads_as_empty_page() {
        let data = json!({
            "node": {
                "commits": { "nodes": [ { "commit": { "statusCheckRollup": null } } ] }
            }
        });
        let path = &[
            "node",
            "commits",
            "nodes",
            "0",
            "commit",
            "statusCheckRollup",
            "contexts",
        ];
        let page = parse_connection(&data, path).expect("should parse");
        assert!(page.nodes.is_empty());
        assert!(!page.has_next);
    }

    #[test]
    fn empty_commit_list_reads_as_empty_page() {
        let data = json!({ "node": { "commits": { "nodes": [] } } });
        let path = &[
            "node",
            "commits",
            "nodes",
            "0",
            "commit",
            "statusCheckRollup",
            "contexts",
        ];
        let page = parse_connection(&data, path).expect("should parse");
        assert!(page.nodes.is_empty());
    }

    #[test]
    fn missing_connection_key_is_a_decode_error() {
        let data = json!({ "search": { "nodes": [] } });
        let err = parse_connection(&data, &["search"]).expect_err("missing pageInfo");
        assert!(matches!(err, GitHubError::Decode(_)));

        let err = parse_connection(&json!({}), &["search"]).expect_err("missing key");
        assert!(matches!(err, GitHubError::Decode(_)));
    }

    #[test]
    fn cursor_resumes_from_a_given_position() {
        let spec = ConnectionSpec::issues("R_abc", 50);
        let cursor = ConnectionCursor::resume(spec, Some("Y3Vyc29yOjEwMA==".into()));
        assert_eq!(cursor.position(), Some("Y3Vyc29yOjEwMA=="));
    }

    #[test]
    fn page_size_is_clamped_to_api_limit() {
        let spec = ConnectionSpec::search_repositories("stars:>=100", 500);
        assert_eq!(spec.page_size, MAX_PAGE_SIZE);

        let spec = ConnectionSpec::issues("R_abc", 0);
        assert_eq!(spec.page_size, 1);
    }
}
