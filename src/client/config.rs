//! Configuration for the GitHub client

use std::time::Duration;

use compact_str::CompactString;

use super::error::{ClientError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Main configuration for the GitHub client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GitHub API base URL
    pub base_url: CompactString,
    /// Personal access token
    pub token: CompactString,
    /// User-Agent header sent with every request
    pub user_agent: CompactString,
    /// Request configuration
    pub request: RequestConfig,
    /// Retry configuration
    pub retry: RetryConfig,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Number of items per page for list requests
    pub per_page: u32,
}

/// Retry back-off configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial sleep between retries; grows linearly by this amount after
    /// each consecutive retryable failure
    pub base_delay: Duration,
}

impl RetryConfig {
    /// Back-off ceiling; once the pre-sleep delay exceeds it the call chain
    /// is abandoned
    pub fn max_delay(&self) -> Duration {
        self.base_delay * 5
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            per_page: 100,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the public GitHub API
    pub fn new(token: impl Into<CompactString>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            token: token.into(),
            user_agent: "ghmine-client".into(),
            request: RequestConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::config_validation(
                "base_url",
                "base URL cannot be empty",
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::config_validation(
                "base_url",
                "base URL must start with http:// or https://",
            ));
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(ClientError::config_validation(
                "base_url",
                "base URL is not a valid URL",
            ));
        }

        if self.token.is_empty() {
            return Err(ClientError::config_validation(
                "token",
                "access token cannot be empty",
            ));
        }

        if self.request.per_page == 0 || self.request.per_page > 100 {
            return Err(ClientError::config_validation(
                "per_page",
                "per_page must be between 1 and 100",
            ));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config_validation(
                "timeout",
                "timeout must be greater than zero",
            ));
        }

        if self.retry.base_delay.is_zero() {
            return Err(ClientError::config_validation(
                "base_delay",
                "retry base delay must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<CompactString>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<CompactString>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set request configuration
    pub fn with_request(mut self, request: RequestConfig) -> Self {
        self.request = request;
        self
    }

    /// Set retry configuration
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_with_token_is_valid() {
        let config = ClientConfig::new("token-value");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_token_is_rejected() {
        let config = ClientConfig::new("");
        assert!(matches!(
            config.validate(),
            Err(ClientError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let config = ClientConfig::new("token-value").with_base_url("ftp://api.github.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_retry_delay_is_rejected() {
        let config = ClientConfig::new("token-value").with_retry(RetryConfig {
            base_delay: Duration::ZERO,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn ceiling_is_five_times_the_base_delay() {
        let retry = RetryConfig {
            base_delay: Duration::from_secs(5),
        };
        assert_eq!(retry.max_delay(), Duration::from_secs(25));
    }
}
