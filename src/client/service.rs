//! The wrapped GitHub service contract

use async_trait::async_trait;
use compact_str::CompactString;
use reqwest::header::HeaderMap;

use super::error::{FailureClass, Result};
use crate::domain::{CommentDto, IssueDto, IssueEventDto, IssueState, RepositoryDto, UserDto};

/// The finite set of remote operations a GitHub mining client exposes
///
/// Both the raw HTTP client and its throttled decorator implement this
/// trait, so callers cannot tell from the shape of a handle whether
/// throttling is in effect. Remote operations return `Ok(None)` for an
/// absent result; on a throttled handle this is deliberately ambiguous
/// between "not found" and "gave up after exhausting retries", and
/// consumers are expected to log and continue rather than crash.
#[async_trait]
pub trait GithubService: Send + Sync {
    /// Quota limit observed on the most recent response, if any
    ///
    /// Exempt from throttling: it is used to refresh the shared quota
    /// state itself and must stay available when the budget is exhausted.
    async fn rate_limit(&self) -> Result<Option<u32>>;

    /// Remaining quota observed on the most recent response, if any
    ///
    /// Exempt from throttling, like [`GithubService::rate_limit`].
    async fn rate_limit_remaining(&self) -> Result<Option<u32>>;

    /// Raw headers of the most recent response
    ///
    /// Exempt from throttling, like [`GithubService::rate_limit`].
    async fn response_headers(&self) -> Result<Option<HeaderMap>>;

    async fn repository(&self, owner: &str, name: &str) -> Result<Option<RepositoryDto>>;

    async fn user_repositories(&self, login: &str) -> Result<Option<Vec<RepositoryDto>>>;

    /// Collaborator logins for a repository
    async fn repository_collaborators(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Vec<CompactString>>>;

    async fn repository_contributors(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Vec<UserDto>>>;

    async fn user(&self, login: &str) -> Result<Option<UserDto>>;

    async fn issues(
        &self,
        owner: &str,
        name: &str,
        state: IssueState,
    ) -> Result<Option<Vec<IssueDto>>>;

    async fn issue(&self, owner: &str, name: &str, number: u64) -> Result<Option<IssueDto>>;

    async fn issue_comments(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<Option<Vec<CommentDto>>>;

    async fn issue_events(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<Option<Vec<IssueEventDto>>>;

    /// Fetch open and closed issues and merge whatever halves exist
    ///
    /// Either half may be absent independently: issues disabled for the
    /// repository, a not-found response, or a throttled handle that gave
    /// up on one half. An absent half yields partial data rather than
    /// losing the other; only when both are absent is the result `None`.
    /// Failures that do not classify as not-found propagate unchanged.
    async fn all_issues(&self, owner: &str, name: &str) -> Result<Option<Vec<IssueDto>>> {
        let open = absent_on_not_found(self.issues(owner, name, IssueState::Open).await)?;
        let closed = absent_on_not_found(self.issues(owner, name, IssueState::Closed).await)?;

        match (open, closed) {
            (None, None) => Ok(None),
            (open, closed) => Ok(Some(
                open.into_iter()
                    .flatten()
                    .chain(closed.into_iter().flatten())
                    .collect(),
            )),
        }
    }
}

// A missing half surfaces as `Ok(None)` on a throttled handle but as a
// not-found error on a raw one; fold both into "absent".
fn absent_on_not_found<T>(result: Result<Option<T>>) -> Result<Option<T>> {
    match result {
        Err(err) if err.classify() == FailureClass::NotFound => Ok(None),
        other => other,
    }
}
