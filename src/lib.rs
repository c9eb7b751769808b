//! Throttled GitHub API client for repository data mining
//!
//! Wraps a plain GitHub REST client in a decorator that enforces a shared
//! API quota, classifies failures, and retries with linear back-off. The
//! throttled handle implements the same [`client::GithubService`] contract
//! as the raw one, so data-retrieval code needs no awareness that
//! throttling and retry are happening underneath it.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ghmine::{ApiThrottle, ClientConfig, GithubApi, GithubService, throttle_api};
//!
//! # async fn run() -> ghmine::client::Result<()> {
//! let config = ClientConfig::new("<personal access token>");
//! let throttle = Arc::new(ApiThrottle::new());
//! let github = throttle_api(GithubApi::new(config)?, throttle);
//!
//! // May block on the shared quota and retry transient failures; `None`
//! // means the repository is gone or the call was abandoned.
//! let repo = github.repository("octocat", "hello-world").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod domain;
pub mod throttle;

pub use client::{
    ClientConfig, ClientError, GithubApi, GithubService, Throttled, throttle_api, throttle_service,
};
pub use throttle::ApiThrottle;
