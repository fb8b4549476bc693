//! The GraphQL documents the crawler issues.
//!
//! Every document selects the `rateLimit` envelope alongside its data so the
//! credential pool learns each token's budget from every response.

/// One page of repositories from the search connection.
pub const SEARCH_REPOSITORIES: &str = r#"
query SearchRepositories($query: String!, $first: Int!, $after: String) {
  rateLimit { cost remaining resetAt }
  search(query: $query, type: REPOSITORY, first: $first, after: $after) {
    repositoryCount
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on Repository {
        id
        nameWithOwner
        stargazerCount
        createdAt
        updatedAt
      }
    }
  }
}
"#;

/// Count-only probe for the partition planner. `first: 1` is the smallest
/// the search connection accepts; the nodes are ignored.
pub const SEARCH_REPOSITORY_COUNT: &str = r#"
query SearchRepositoryCount($query: String!) {
  rateLimit { cost remaining resetAt }
  search(query: $query, type: REPOSITORY, first: 1) {
    repositoryCount
  }
}
"#;

/// One page of a repository's issues, oldest first so cursors stay stable
/// while the crawl is running.
pub const REPOSITORY_ISSUES: &str = r#"
query RepositoryIssues($id: ID!, $first: Int!, $after: String) {
  rateLimit { cost remaining resetAt }
  node(id: $id) {
    ... on Repository {
      issues(first: $first, after: $after, orderBy: { field: CREATED_AT, direction: ASC }) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          number
          title
          createdAt
        }
      }
    }
  }
}
"#;

/// One page of a repository's pull requests.
pub const REPOSITORY_PULL_REQUESTS: &str = r#"
query RepositoryPullRequests($id: ID!, $first: Int!, $after: String) {
  rateLimit { cost remaining resetAt }
  node(id: $id) {
    ... on Repository {
      pullRequests(first: $first, after: $after, orderBy: { field: CREATED_AT, direction: ASC }) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          number
          title
          createdAt
        }
      }
    }
  }
}
"#;

/// One page of an issue's comments.
pub const ISSUE_COMMENTS: &str = r#"
query IssueComments($id: ID!, $first: Int!, $after: String) {
  rateLimit { cost remaining resetAt }
  node(id: $id) {
    ... on Issue {
      comments(first: $first, after: $after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          body
          createdAt
        }
      }
    }
  }
}
"#;

/// One page of a pull request's comments.
pub const PULL_REQUEST_COMMENTS: &str = r#"
query PullRequestComments($id: ID!, $first: Int!, $after: String) {
  rateLimit { cost remaining resetAt }
  node(id: $id) {
    ... on PullRequest {
      comments(first: $first, after: $after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          body
          createdAt
        }
      }
    }
  }
}
"#;

/// One page of a pull request's reviews.
pub const PULL_REQUEST_REVIEWS: &str = r#"
query PullRequestReviews($id: ID!, $first: Int!, $after: String) {
  rateLimit { cost remaining resetAt }
  node(id: $id) {
    ... on PullRequest {
      reviews(first: $first, after: $after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          body
          createdAt
        }
      }
    }
  }
}
"#;

/// One page of CI check runs on a pull request's head commit. The rollup is
/// null for commits with no CI, which the paginator treats as an empty
/// connection.
pub const PULL_REQUEST_CI_CHECKS: &str = r#"
query PullRequestCiChecks($id: ID!, $first: Int!, $after: String) {
  rateLimit { cost remaining resetAt }
  node(id: $id) {
    ... on PullRequest {
      commits(last: 1) {
        nodes {
          commit {
            statusCheckRollup {
              contexts(first: $first, after: $after) {
                pageInfo { hasNextPage endCursor }
                nodes {
                  ... on CheckRun {
                    id
                    name
                    startedAt
                    completedAt
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;
