//! Error types and failure classification for the GitHub client

use std::error::Error as _;

use compact_str::CompactString;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error from {endpoint}: {message}")]
    JsonParse {
        endpoint: CompactString,
        message: CompactString,
    },

    #[error("API rate limit exceeded")]
    RateLimit,

    #[error("server error (HTTP {status}): {message}")]
    ServerError {
        status: u16,
        message: CompactString,
    },

    #[error("not found: {resource}")]
    NotFound { resource: CompactString },

    #[error("authentication failed")]
    Authentication,

    #[error("GitHub API error: {message}")]
    Api { message: CompactString },

    #[error("invalid configuration: {field}: {message}")]
    ConfigValidation {
        field: CompactString,
        message: CompactString,
    },
}

impl ClientError {
    /// Create a JSON parse error
    pub fn json_parse(
        endpoint: impl Into<CompactString>,
        message: impl Into<CompactString>,
    ) -> Self {
        Self::JsonParse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(resource: impl Into<CompactString>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a server error
    pub fn server_error(status: u16, message: impl Into<CompactString>) -> Self {
        Self::ServerError { status, message: message.into() }
    }

    /// Create a generic API error
    pub fn api(message: impl Into<CompactString>) -> Self {
        Self::Api { message: message.into() }
    }

    /// Create a configuration validation error
    pub fn config_validation(
        field: impl Into<CompactString>,
        message: impl Into<CompactString>,
    ) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Classify this failure for the retry layer; first match wins
    pub fn classify(&self) -> FailureClass {
        match self {
            ClientError::RateLimit => FailureClass::RateLimited,
            ClientError::ServerError { .. } => FailureClass::ServerError,
            ClientError::NotFound { .. } => FailureClass::NotFound,
            ClientError::Http(e) if is_connection_error(e) => FailureClass::Connection,
            _ => FailureClass::Fatal,
        }
    }
}

/// Failure classification driving the retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Remote quota exhausted; retried after back-off
    RateLimited,
    /// Transient server-side failure; retried after back-off
    ServerError,
    /// Resource does not exist; terminal, absorbed to an empty result
    NotFound,
    /// Connection-level failure; retried after back-off
    Connection,
    /// Everything else; propagated to the caller unchanged
    Fatal,
}

impl FailureClass {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureClass::RateLimited | FailureClass::ServerError | FailureClass::Connection
        )
    }
}

// reqwest wraps the transport error; a connection failure may sit directly
// on the error or one level down the source chain as an io::Error.
fn is_connection_error(err: &reqwest::Error) -> bool {
    if err.is_connect() || err.is_timeout() {
        return true;
    }

    let mut cause = err.source();
    for _ in 0..2 {
        let Some(inner) = cause else { break };
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::UnexpectedEof
            );
        }
        cause = inner.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retryable() {
        let class = ClientError::RateLimit.classify();
        assert_eq!(class, FailureClass::RateLimited);
        assert!(class.is_retryable());
    }

    #[test]
    fn server_error_is_retryable() {
        let err = ClientError::server_error(502, "<title>Server Error - GitHub</title>");
        assert_eq!(err.classify(), FailureClass::ServerError);
        assert!(err.classify().is_retryable());
    }

    #[test]
    fn not_found_is_terminal_but_not_fatal() {
        let err = ClientError::not_found("repos/octocat/missing");
        assert_eq!(err.classify(), FailureClass::NotFound);
        assert!(!err.classify().is_retryable());
    }

    #[test]
    fn unrecognized_failures_are_fatal() {
        assert_eq!(
            ClientError::api("validation failed").classify(),
            FailureClass::Fatal
        );
        assert_eq!(
            ClientError::Authentication.classify(),
            FailureClass::Fatal
        );
        assert_eq!(
            ClientError::json_parse("/repos/a/b", "trailing characters").classify(),
            FailureClass::Fatal
        );
    }

    #[tokio::test]
    async fn refused_connection_classifies_as_connection_failure() {
        // Port 9 (discard) is not listening; the connect is refused locally.
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/")
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
            .unwrap_err();

        let err = ClientError::from(err);
        assert_eq!(err.classify(), FailureClass::Connection);
    }

    #[test]
    fn display_carries_the_failing_resource() {
        let err = ClientError::not_found("repos/octocat/missing");
        assert_eq!(err.to_string(), "not found: repos/octocat/missing");
    }
}
