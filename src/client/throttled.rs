//! Throttle- and retry-aware decorator over a GitHub service

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use compact_str::{CompactString, format_compact};
use reqwest::header::HeaderMap;
use tracing::{error, trace, warn};

use super::{
    api::GithubApi,
    config::RetryConfig,
    error::{FailureClass, Result},
    service::GithubService,
};
use crate::{
    domain::{CommentDto, IssueDto, IssueEventDto, IssueState, RepositoryDto, UserDto},
    throttle::ApiThrottle,
};

/// Methods exempt from throttling
///
/// These observe quota state itself and must stay available even when the
/// budget is exhausted, otherwise the wrapper would deadlock against its
/// own throttle.
pub const UNTHROTTLED_METHODS: &[&str] = &["rate_limit", "rate_limit_remaining", "response_headers"];

/// Decorator that makes every call on a wrapped service throttle- and
/// retry-aware
///
/// Implements the same [`GithubService`] contract as the wrapped handle.
/// Each operation funnels through one shared routine that waits on the
/// shared [`ApiThrottle`], invokes the real call, refreshes the throttle
/// from the target's quota snapshot on success, and on failure classifies
/// the error: retryable kinds sleep a linearly growing back-off and try
/// again, not-found and abandonment absorb to `Ok(None)`, anything else
/// propagates unchanged.
#[derive(Debug)]
pub struct Throttled<S> {
    inner: S,
    throttle: Arc<ApiThrottle>,
    base_delay: Duration,
}

/// Wrap a service handle so all its calls share `throttle`
///
/// The returned handle is call-compatible with the unwrapped one; callers
/// need no awareness that throttling and retry are happening.
pub fn throttle_service<S: GithubService>(inner: S, throttle: Arc<ApiThrottle>) -> Throttled<S> {
    Throttled::new(inner, throttle)
}

/// Wrap a raw API client using the retry settings from its own config
pub fn throttle_api(api: GithubApi, throttle: Arc<ApiThrottle>) -> Throttled<GithubApi> {
    let base_delay = api.config().retry.base_delay;
    Throttled::new(api, throttle).with_base_delay(base_delay)
}

impl<S: GithubService> Throttled<S> {
    pub fn new(inner: S, throttle: Arc<ApiThrottle>) -> Self {
        Self {
            inner,
            throttle,
            base_delay: RetryConfig::default().base_delay,
        }
    }

    /// Set the base retry delay; the abandonment ceiling stays at five
    /// times this value
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// The wrapped service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The shared throttle
    pub fn throttle(&self) -> &Arc<ApiThrottle> {
        &self.throttle
    }

    fn max_delay(&self) -> Duration {
        self.base_delay * 5
    }

    /// Shared call routine every forwarded operation funnels through
    ///
    /// Back-off state is local to this call chain: a fresh invocation
    /// always starts from the base delay.
    async fn call_throttled<T, F, Fut>(
        &self,
        method: &'static str,
        args: &str,
        call: F,
    ) -> Result<Option<T>>
    where
        T: Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        trace!(method, args, "method invoked");
        if UNTHROTTLED_METHODS.contains(&method) {
            return call().await;
        }

        let mut delay = self.base_delay;
        loop {
            self.throttle.call_wait().await;

            let err = match call().await {
                Ok(value) => {
                    self.refresh_throttle().await;
                    return Ok(value);
                },
                Err(err) => err,
            };

            // Ceiling check comes before any classification is acted on.
            if delay > self.max_delay() {
                error!(method, args, "too many failures; giving up and returning nothing");
                return Ok(None);
            }

            let delay_ms = delay.as_millis() as u64;
            match err.classify() {
                FailureClass::RateLimited => {
                    warn!(
                        method,
                        args, delay_ms, "API rate limit exceeded; sleeping before retry"
                    );
                },
                FailureClass::ServerError => {
                    warn!(
                        method,
                        args, delay_ms, "server error from GitHub; sleeping before retry"
                    );
                },
                FailureClass::Connection => {
                    error!(
                        method,
                        args, delay_ms, "connection failure; sleeping before retry"
                    );
                },
                FailureClass::NotFound => {
                    warn!(method, args, "GitHub returned not found");
                    return Ok(None);
                },
                FailureClass::Fatal => {
                    error!(method, args, error = %err, "unhandled failure; propagating");
                    return Err(err);
                },
            }

            tokio::time::sleep(delay).await;
            delay += self.base_delay;
        }
    }

    /// Copy the target's freshest quota metadata into the shared throttle
    async fn refresh_throttle(&self) {
        if let Ok(Some(limit)) = self.inner.rate_limit().await {
            self.throttle.set_rate_limit(limit);
        }
        if let Ok(Some(remaining)) = self.inner.rate_limit_remaining().await {
            self.throttle.set_rate_limit_remaining(remaining);
        }
    }
}

#[async_trait]
impl<S: GithubService> GithubService for Throttled<S> {
    async fn rate_limit(&self) -> Result<Option<u32>> {
        self.call_throttled("rate_limit", "", || self.inner.rate_limit())
            .await
    }

    async fn rate_limit_remaining(&self) -> Result<Option<u32>> {
        self.call_throttled("rate_limit_remaining", "", || {
            self.inner.rate_limit_remaining()
        })
        .await
    }

    async fn response_headers(&self) -> Result<Option<HeaderMap>> {
        self.call_throttled("response_headers", "", || self.inner.response_headers())
            .await
    }

    async fn repository(&self, owner: &str, name: &str) -> Result<Option<RepositoryDto>> {
        let args = format_compact!("{owner}/{name}");
        self.call_throttled("repository", &args, || self.inner.repository(owner, name))
            .await
    }

    async fn user_repositories(&self, login: &str) -> Result<Option<Vec<RepositoryDto>>> {
        self.call_throttled("user_repositories", login, || {
            self.inner.user_repositories(login)
        })
        .await
    }

    async fn repository_collaborators(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Vec<CompactString>>> {
        let args = format_compact!("{owner}/{name}");
        self.call_throttled("repository_collaborators", &args, || {
            self.inner.repository_collaborators(owner, name)
        })
        .await
    }

    async fn repository_contributors(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Vec<UserDto>>> {
        let args = format_compact!("{owner}/{name}");
        self.call_throttled("repository_contributors", &args, || {
            self.inner.repository_contributors(owner, name)
        })
        .await
    }

    async fn user(&self, login: &str) -> Result<Option<UserDto>> {
        self.call_throttled("user", login, || self.inner.user(login))
            .await
    }

    async fn issues(
        &self,
        owner: &str,
        name: &str,
        state: IssueState,
    ) -> Result<Option<Vec<IssueDto>>> {
        let args = format_compact!("{owner}/{name} state={state}");
        self.call_throttled("issues", &args, || self.inner.issues(owner, name, state))
            .await
    }

    async fn issue(&self, owner: &str, name: &str, number: u64) -> Result<Option<IssueDto>> {
        let args = format_compact!("{owner}/{name}#{number}");
        self.call_throttled("issue", &args, || self.inner.issue(owner, name, number))
            .await
    }

    async fn issue_comments(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<Option<Vec<CommentDto>>> {
        let args = format_compact!("{owner}/{name}#{number}");
        self.call_throttled("issue_comments", &args, || {
            self.inner.issue_comments(owner, name, number)
        })
        .await
    }

    async fn issue_events(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<Option<Vec<IssueEventDto>>> {
        let args = format_compact!("{owner}/{name}#{number}");
        self.call_throttled("issue_events", &args, || {
            self.inner.issue_events(owner, name, number)
        })
        .await
    }
}
