//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::blocking::DEFAULT_TIMEOUT;
use crate::transport::DEFAULT_TRANSPORT_TIMEOUT;

/// Settings for constructing an `HttpClient`.
///
/// Deserializable so it can be embedded in an application's own config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Timeout for blocking calls, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Hard bound on any single network request, in milliseconds. Requests
    /// abandoned by a timed-out or cancelled caller still run until this
    /// passes.
    #[serde(default = "default_transport_timeout_ms")]
    pub transport_timeout_ms: u64,
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_timeout_ms() -> u64 {
    millis(DEFAULT_TIMEOUT)
}

fn default_transport_timeout_ms() -> u64 {
    millis(DEFAULT_TRANSPORT_TIMEOUT)
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout_ms: default_timeout_ms(),
            transport_timeout_ms: default_transport_timeout_ms(),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn transport_timeout(&self) -> Duration {
        Duration::from_millis(self.transport_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_defaults_to_three_seconds() {
        let config: ClientConfig = serde_json::from_str(r#"{"base_url":"http://localhost:3000"}"#).unwrap();
        assert_eq!(config.default_timeout(), Duration::from_secs(3));
        assert_eq!(config.transport_timeout(), Duration::from_secs(30));
        assert_eq!(config, ClientConfig::new("http://localhost:3000"));
    }

    #[test]
    fn transport_timeout_can_be_overridden() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://h","transport_timeout_ms":500}"#).unwrap();
        assert_eq!(config.transport_timeout(), Duration::from_millis(500));
        assert_eq!(config.default_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn millis_saturates_instead_of_truncating() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn timeout_can_be_overridden() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://h","timeout_ms":250}"#).unwrap();
        assert_eq!(config.default_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn base_url_is_required() {
        assert!(serde_json::from_str::<ClientConfig>(r#"{"timeout_ms":250}"#).is_err());
    }
}
