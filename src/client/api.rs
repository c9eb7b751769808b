//! Raw HTTP client for the GitHub REST API

use std::sync::RwLock;

use async_trait::async_trait;
use compact_str::{CompactString, format_compact};
use reqwest::{Client, RequestBuilder, Response, header::HeaderMap};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{
    config::ClientConfig,
    error::{ClientError, Result},
    service::GithubService,
};
use crate::domain::{CommentDto, IssueDto, IssueEventDto, IssueState, RepositoryDto, UserDto};

/// Plain, unthrottled GitHub API client
///
/// Every response's rate-limit headers are snapshotted so the quota
/// introspection methods answer from memory instead of issuing another
/// remote call.
#[derive(Debug)]
pub struct GithubApi {
    client: Client,
    config: ClientConfig,
    quota: RwLock<QuotaSnapshot>,
}

#[derive(Debug, Default)]
struct QuotaSnapshot {
    limit: Option<u32>,
    remaining: Option<u32>,
    headers: Option<HeaderMap>,
}

/// GitHub API error response body
#[derive(Debug, Deserialize)]
struct GithubApiError {
    message: CompactString,
}

impl GithubApi {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request.timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            client,
            config,
            quota: RwLock::new(QuotaSnapshot::default()),
        })
    }

    /// Current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Perform authenticated GET request and deserialize the JSON response
    async fn get_json<T>(&self, url: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.authenticated_request(url).send().await?;
        self.handle_response(response).await
    }

    /// Create authenticated request builder
    fn authenticated_request(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", format!("token {}", self.config.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", self.config.user_agent.as_str())
    }

    /// Handle HTTP response: snapshot quota headers, then deserialize or
    /// map to an error
    async fn handle_response<T>(&self, response: Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let endpoint = CompactString::from(response.url().path());
        let status = response.status();
        self.record_quota(response.headers());
        let body = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                warn!(endpoint = %endpoint, error = %e, "failed to parse response body");
                ClientError::json_parse(endpoint, e.to_string())
            })
        } else {
            self.handle_error_response(status.as_u16(), &endpoint, &body)
        }
    }

    /// Snapshot the rate-limit headers of a response
    fn record_quota(&self, headers: &HeaderMap) {
        let limit = header_u32(headers, "x-ratelimit-limit");
        let remaining = header_u32(headers, "x-ratelimit-remaining");

        let mut quota = self.quota.write().unwrap();
        if limit.is_some() {
            quota.limit = limit;
        }
        if remaining.is_some() {
            quota.remaining = remaining;
        }
        quota.headers = Some(headers.clone());
        debug!(?limit, ?remaining, "quota headers recorded");
    }

    /// Map a non-success status to the error taxonomy
    fn handle_error_response<T>(&self, status: u16, endpoint: &str, body: &str) -> Result<T> {
        match status {
            401 => Err(ClientError::Authentication),
            403 if body.to_lowercase().contains("rate limit exceeded") => {
                Err(ClientError::RateLimit)
            },
            404 => Err(ClientError::not_found(endpoint)),
            429 => Err(ClientError::RateLimit),
            500..=599 => Err(ClientError::server_error(status, body)),
            _ => {
                if let Ok(api_error) = serde_json::from_str::<GithubApiError>(body) {
                    Err(ClientError::api(format_compact!(
                        "HTTP {}: {}",
                        status,
                        api_error.message
                    )))
                } else {
                    Err(ClientError::api(format_compact!("HTTP {}: {}", status, body)))
                }
            },
        }
    }
}

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

#[async_trait]
impl GithubService for GithubApi {
    async fn rate_limit(&self) -> Result<Option<u32>> {
        Ok(self.quota.read().unwrap().limit)
    }

    async fn rate_limit_remaining(&self) -> Result<Option<u32>> {
        Ok(self.quota.read().unwrap().remaining)
    }

    async fn response_headers(&self) -> Result<Option<HeaderMap>> {
        Ok(self.quota.read().unwrap().headers.clone())
    }

    #[instrument(skip(self))]
    async fn repository(&self, owner: &str, name: &str) -> Result<Option<RepositoryDto>> {
        let url = format_compact!("{}/repos/{}/{}", self.config.base_url, owner, name);
        let repo = self.get_json(&url).await?;
        Ok(Some(repo))
    }

    #[instrument(skip(self))]
    async fn user_repositories(&self, login: &str) -> Result<Option<Vec<RepositoryDto>>> {
        let url = format_compact!(
            "{}/users/{}/repos?per_page={}",
            self.config.base_url,
            login,
            self.config.request.per_page
        );
        let repos: Vec<RepositoryDto> = self.get_json(&url).await?;
        debug!(login, repo_count = repos.len(), "fetched user repositories");
        Ok(Some(repos))
    }

    #[instrument(skip(self))]
    async fn repository_collaborators(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Vec<CompactString>>> {
        let url = format_compact!(
            "{}/repos/{}/{}/collaborators?per_page={}",
            self.config.base_url,
            owner,
            name,
            self.config.request.per_page
        );
        let collaborators: Vec<UserDto> = self.get_json(&url).await?;
        Ok(Some(collaborators.into_iter().map(|c| c.login).collect()))
    }

    #[instrument(skip(self))]
    async fn repository_contributors(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Vec<UserDto>>> {
        let url = format_compact!(
            "{}/repos/{}/{}/contributors?per_page={}",
            self.config.base_url,
            owner,
            name,
            self.config.request.per_page
        );
        let contributors = self.get_json(&url).await?;
        Ok(Some(contributors))
    }

    #[instrument(skip(self))]
    async fn user(&self, login: &str) -> Result<Option<UserDto>> {
        let url = format_compact!("{}/users/{}", self.config.base_url, login);
        let user = self.get_json(&url).await?;
        Ok(Some(user))
    }

    #[instrument(skip(self))]
    async fn issues(
        &self,
        owner: &str,
        name: &str,
        state: IssueState,
    ) -> Result<Option<Vec<IssueDto>>> {
        let url = format_compact!(
            "{}/repos/{}/{}/issues?state={}&per_page={}",
            self.config.base_url,
            owner,
            name,
            state,
            self.config.request.per_page
        );
        let issues: Vec<IssueDto> = self.get_json(&url).await?;
        debug!(owner, name, %state, issue_count = issues.len(), "fetched issues");
        Ok(Some(issues))
    }

    #[instrument(skip(self))]
    async fn issue(&self, owner: &str, name: &str, number: u64) -> Result<Option<IssueDto>> {
        let url = format_compact!(
            "{}/repos/{}/{}/issues/{}",
            self.config.base_url,
            owner,
            name,
            number
        );
        let issue = self.get_json(&url).await?;
        Ok(Some(issue))
    }

    #[instrument(skip(self))]
    async fn issue_comments(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<Option<Vec<CommentDto>>> {
        let url = format_compact!(
            "{}/repos/{}/{}/issues/{}/comments?per_page={}",
            self.config.base_url,
            owner,
            name,
            number,
            self.config.request.per_page
        );
        let comments = self.get_json(&url).await?;
        Ok(Some(comments))
    }

    #[instrument(skip(self))]
    async fn issue_events(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<Option<Vec<IssueEventDto>>> {
        let url = format_compact!(
            "{}/repos/{}/{}/issues/{}/events?per_page={}",
            self.config.base_url,
            owner,
            name,
            number,
            self.config.request.per_page
        );
        let events = self.get_json(&url).await?;
        Ok(Some(events))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;

    fn api_for(server: &MockServer) -> GithubApi {
        let config = ClientConfig::new("test-token").with_base_url(server.uri());
        GithubApi::new(config).unwrap()
    }

    fn repo_body() -> serde_json::Value {
        serde_json::json!({
            "id": 1296269,
            "name": "hello-world",
            "full_name": "octocat/hello-world",
            "html_url": "https://github.com/octocat/hello-world",
            "stargazers_count": 80,
            "size": 108
        })
    }

    #[tokio::test]
    async fn repository_parses_and_records_quota_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-ratelimit-limit", "60")
                    .insert_header("x-ratelimit-remaining", "59")
                    .set_body_json(repo_body()),
            )
            .mount(&server)
            .await;

        let api = api_for(&server);
        let repo = api.repository("octocat", "hello-world").await.unwrap();

        assert_eq!(repo.unwrap().full_name, "octocat/hello-world");
        assert_eq!(api.rate_limit().await.unwrap(), Some(60));
        assert_eq!(api.rate_limit_remaining().await.unwrap(), Some(59));
        assert!(api.response_headers().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn quota_is_unknown_before_any_response() {
        let server = MockServer::start().await;
        let api = api_for(&server);

        assert_eq!(api.rate_limit().await.unwrap(), None);
        assert_eq!(api.rate_limit_remaining().await.unwrap(), None);
        assert!(api.response_headers().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_repository_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Not Found"}"#))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.repository("octocat", "missing").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }

    #[tokio::test]
    async fn quota_exhaustion_maps_to_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                r#"{"message":"API rate limit exceeded for 127.0.0.1."}"#,
            ))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.user("octocat").await.unwrap_err();
        assert!(matches!(err, ClientError::RateLimit));
    }

    #[tokio::test]
    async fn server_error_page_maps_to_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string("<title>Server Error - GitHub</title>"),
            )
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.user("octocat").await.unwrap_err();
        assert!(matches!(err, ClientError::ServerError { status: 500, .. }));
    }

    #[tokio::test]
    async fn issues_request_carries_the_state_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/issues"))
            .and(query_param("state", "closed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let issues = api
            .issues("octocat", "hello-world", IssueState::Closed)
            .await
            .unwrap();
        assert_eq!(issues.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn collaborators_reduce_to_logins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/collaborators"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 1, "login": "octocat" },
                { "id": 2, "login": "hubot" }
            ])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let logins = api
            .repository_collaborators("octocat", "hello-world")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(logins, vec!["octocat", "hubot"]);
    }

    #[tokio::test]
    async fn all_issues_on_a_raw_handle_merges_the_surviving_half() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/issues"))
            .and(query_param("state", "open"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Not Found"}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/issues"))
            .and(query_param("state", "closed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 1,
                "number": 7,
                "title": "stale throttle state",
                "state": "closed",
                "html_url": "https://github.com/octocat/hello-world/issues/7"
            }])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let issues = api
            .all_issues("octocat", "hello-world")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].number, 7);
    }

    #[tokio::test]
    async fn all_issues_on_a_raw_handle_still_propagates_fatal_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/issues"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"Bad credentials"}"#))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.all_issues("octocat", "hello-world").await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication));
    }

    #[tokio::test]
    async fn malformed_body_maps_to_json_parse() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.user("octocat").await.unwrap_err();
        assert!(matches!(err, ClientError::JsonParse { .. }));
    }
}
