//! Client configuration.
//!
//! Values come from the environment, falling back to defaults suitable for a
//! locally running tables service.

use std::env;

/// Default base URL if not specified via environment variable.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for connecting to the tables API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL the `tables/...` paths are resolved against.
    pub base_url: String,

    /// Per-request timeout applied by the HTTP transport.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Load configuration from `INVASIVE_API_BASE_URL` and
    /// `INVASIVE_API_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let base_url =
            env::var("INVASIVE_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_secs = env::var("INVASIVE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url,
            timeout_secs,
        }
    }

    /// Create a configuration with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }
}
