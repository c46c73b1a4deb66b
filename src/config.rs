//! Configuration for the remote client and the conversion workflow.
//!
//! Two structs, two concerns:
//!
//! * [`ClientConfig`]: where the conversion service lives and how patient
//!   to be with it. The base address is an explicit value; the library never
//!   reads it from the environment, so tests can point a client at a fake
//!   endpoint without touching process state.
//! * [`WorkflowConfig`]: timing of the simulated progress shown while a
//!   request is in flight.
//!
//! Both are built through builders that validate on `build()`.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base address used when none is configured (local development server).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Settings for [`crate::client::RemoteClient`].
///
/// # Example
/// ```rust
/// use fconverter::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://convert.example.com/")
///     .request_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "https://convert.example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme + host (+ optional path prefix), without a trailing slash.
    /// Default: `http://localhost:8000`.
    pub base_url: String,

    /// Whole-request timeout in seconds. Default: 120.
    ///
    /// Word documents can take the service a while to render; the timeout
    /// covers upload, server-side conversion and the response.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            user_agent: concat!("fconverter/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = normalise_base_url(&url.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs.max(1);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ConvertError> {
        let c = &self.config;
        if c.base_url.is_empty() {
            return Err(ConvertError::InvalidConfig("base URL must not be empty".into()));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ConvertError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

/// Settings for the simulated progress estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Milliseconds between progress ticks. Default: 200.
    pub tick_interval_ms: u64,

    /// Percentage points added per tick. Default: 10.
    pub progress_step: u8,

    /// Highest value the estimator may reach on its own. Default: 90.
    ///
    /// Must stay below 100: only a successful response may report completion.
    pub progress_ceiling: u8,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            progress_step: 10,
            progress_ceiling: 90,
        }
    }
}

impl WorkflowConfig {
    /// Create a new builder for `WorkflowConfig`.
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Builder for [`WorkflowConfig`].
#[derive(Debug)]
pub struct WorkflowConfigBuilder {
    config: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval_ms = ms;
        self
    }

    pub fn progress_step(mut self, step: u8) -> Self {
        self.config.progress_step = step;
        self
    }

    pub fn progress_ceiling(mut self, ceiling: u8) -> Self {
        self.config.progress_ceiling = ceiling;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkflowConfig, ConvertError> {
        let c = &self.config;
        if c.tick_interval_ms == 0 {
            return Err(ConvertError::InvalidConfig(
                "tick interval must be ≥ 1 ms".into(),
            ));
        }
        if c.progress_step == 0 {
            return Err(ConvertError::InvalidConfig(
                "progress step must be ≥ 1".into(),
            ));
        }
        if c.progress_ceiling >= 100 {
            return Err(ConvertError::InvalidConfig(format!(
                "progress ceiling must be below 100, got {}",
                c.progress_ceiling
            )));
        }
        Ok(self.config)
    }
}

/// Trim whitespace and trailing slashes so paths can be appended verbatim.
pub fn normalise_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url, "http://localhost:8000");
        assert_eq!(c.request_timeout_secs, 120);
        assert!(c.user_agent.starts_with("fconverter/"));
    }

    #[test]
    fn base_url_is_normalised() {
        let c = ClientConfig::builder()
            .base_url("  http://10.0.0.5:9000/converter// ")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://10.0.0.5:9000/converter");
    }

    #[test]
    fn base_url_requires_http_scheme() {
        let err = ClientConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));

        assert!(ClientConfig::builder().base_url("").build().is_err());
    }

    #[test]
    fn timeouts_are_at_least_one_second() {
        let c = ClientConfig::builder()
            .request_timeout_secs(0)
            .connect_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.request_timeout(), Duration::from_secs(1));
        assert_eq!(c.connect_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn workflow_defaults() {
        let w = WorkflowConfig::default();
        assert_eq!(w.tick_interval(), Duration::from_millis(200));
        assert_eq!(w.progress_step, 10);
        assert_eq!(w.progress_ceiling, 90);
    }

    #[test]
    fn workflow_ceiling_must_stay_below_completion() {
        assert!(WorkflowConfig::builder().progress_ceiling(100).build().is_err());
        assert!(WorkflowConfig::builder().progress_step(0).build().is_err());
        assert!(WorkflowConfig::builder().tick_interval_ms(0).build().is_err());
        let w = WorkflowConfig::builder()
            .tick_interval_ms(50)
            .progress_step(25)
            .progress_ceiling(75)
            .build()
            .unwrap();
        assert_eq!(w.progress_step, 25);
    }
}
