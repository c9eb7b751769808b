//! GitHub client modules
//!
//! The raw HTTP client and the throttled decorator around it, split into
//! focused components: configuration, the error taxonomy, the shared
//! service contract, and the interception layer.

pub mod api;
pub mod config;
pub mod error;
pub mod service;
pub mod throttled;

// Re-export main types for convenience
pub use api::GithubApi;
pub use config::ClientConfig;
pub use error::{ClientError, FailureClass, Result};
pub use service::GithubService;
pub use throttled::{Throttled, throttle_api, throttle_service};
