//! Settings shared by every dataflow job.

use std::time::Duration;

/// Default REST root of the spatial data services.
pub const DEFAULT_BASE_URL: &str = "https://spatial.virtualearth.net/REST/v1";

/// Default user agent for dataflow requests.
pub const DEFAULT_USER_AGENT: &str = "geodata-client/0.1";

/// Client version reported in the `clientApi` query parameter.
pub const DEFAULT_CLIENT_VERSION: &str = "geodata-0.1";

/// Delay between two status polls.
const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;

/// Consecutive poll failures tolerated before the job is declared unknown.
const DEFAULT_MAX_POLL_FAILURES: u32 = 3;

/// Request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the job poller and the services built on it.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use geodata_client::DataflowConfig;
///
/// let config = DataflowConfig::new("https://example.org/REST/v1")
///     .with_poll_interval(Duration::from_secs(5))
///     .with_client_version("batch-tool-2.1");
/// assert_eq!(config.max_poll_failures, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataflowConfig {
    /// REST root, without a trailing slash.
    pub base_url: String,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Consecutive poll failures tolerated before giving up.
    pub max_poll_failures: u32,
    /// Version string sent with every request.
    pub client_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for DataflowConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_poll_failures: DEFAULT_MAX_POLL_FAILURES,
            client_version: DEFAULT_CLIENT_VERSION.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl DataflowConfig {
    /// Configuration for the service rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }

    /// Set the delay between status polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set how many consecutive poll failures are tolerated.
    #[must_use]
    pub const fn with_max_poll_failures(mut self, max_poll_failures: u32) -> Self {
        self.max_poll_failures = max_poll_failures;
        self
    }

    /// Set the client version string.
    #[must_use]
    pub fn with_client_version(mut self, client_version: impl Into<String>) -> Self {
        self.client_version = client_version.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_match_service_guidance() {
        let config = DataflowConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(15_000));
        assert_eq!(config.max_poll_failures, 3);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[rstest]
    fn builder_trims_trailing_slash_and_sets_fields() {
        let config = DataflowConfig::new("http://localhost:8080/REST/v1/")
            .with_poll_interval(Duration::ZERO)
            .with_max_poll_failures(5)
            .with_timeout(Duration::from_secs(2))
            .with_user_agent("test-agent/1.0");
        assert_eq!(config.base_url, "http://localhost:8080/REST/v1");
        assert_eq!(config.poll_interval, Duration::ZERO);
        assert_eq!(config.max_poll_failures, 5);
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }
}
