//! Client configuration
//!
//! The transport implementation and the user-agent string are resolved at
//! construction time from this configuration, not through compile-time
//! platform switches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default service host
pub const DEFAULT_HOST: &str = "api.stratus-telemetry.net";
/// Default service port
pub const DEFAULT_PORT: u16 = 80;

/// Configuration for a Stratus client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service hostname, also sent as the `Host` header
    #[serde(default = "default_host")]
    pub host: String,
    /// Service port
    #[serde(default = "default_port")]
    pub port: u16,
    /// API key sent with every request
    pub api_key: String,
    /// User-agent string sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Deadline for every blocking read, in milliseconds. A silently dead
    /// connection surfaces as NotReachable once this elapses.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Sleep between polls while waiting for bytes, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Match header names case-insensitively
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_user_agent() -> String {
    format!("Stratus Rust Client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_read_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    2
}

fn default_case_insensitive() -> bool {
    true
}

impl ClientConfig {
    /// Configuration for the default service endpoint with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: api_key.into(),
            user_agent: default_user_agent(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            case_insensitive: default_case_insensitive(),
        }
    }

    /// Point the client at a different endpoint
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Load a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub(crate) fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
