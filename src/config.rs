// src/config.rs
// =============================================================================
// Walker configuration.
//
// The walker never reads the environment itself. Whoever drives it (the CLI
// in main.rs, or a test) builds a WalkerConfig and hands it over. This keeps
// unit tests independent of process-wide state.
// =============================================================================

use crate::error::{Result, WalkError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Repository types kept by default when loading the catalog.
pub const DEFAULT_ACCEPTED_TYPES: [&str; 2] = ["LOCAL", "VIRTUAL"];

/// Default ceiling on directory nesting below a repository root.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// How transient request failures are retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    // Delay before retry number `attempt` (0-based): doubles every time,
    // never exceeding max_backoff
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Everything needed to talk to one repository manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkerConfig {
    /// Server URL, e.g. https://artifacts.example.com
    pub server_url: String,
    /// Path of the REST API below the server URL
    pub api_root: String,
    pub username: String,
    /// API token used as the basic-auth password
    pub api_token: String,
    /// Upper bound of the random pause before each request
    pub max_wait: Duration,
    /// Minimum spacing between request starts, shared by all workers
    pub min_interval: Duration,
    /// None means unbounded (the visited set still stops cycles)
    pub max_depth: Option<usize>,
    pub max_in_flight: usize,
    pub accepted_types: BTreeSet<String>,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            api_root: "/".to_string(),
            username: String::new(),
            api_token: String::new(),
            max_wait: Duration::ZERO,
            min_interval: Duration::ZERO,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            max_in_flight: 1,
            accepted_types: DEFAULT_ACCEPTED_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl WalkerConfig {
    // Creates a config with the required fields and defaults for the rest
    pub fn new(server_url: &str, api_root: &str, username: &str, api_token: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            api_root: api_root.to_string(),
            username: username.to_string(),
            api_token: api_token.to_string(),
            ..Self::default()
        }
    }

    // Checks the settings the walker cannot work without
    //
    // Only username + API token authentication is supported, so both must
    // be present.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() || self.api_token.trim().is_empty() {
            return Err(WalkError::Configuration(
                "Must use API token (other authentication means not implemented)".to_string(),
            ));
        }
        if self.server_url.trim().is_empty() {
            return Err(WalkError::Configuration("Server URL is empty".to_string()));
        }
        Url::parse(&self.server_url).map_err(|e| {
            WalkError::Configuration(format!("Invalid server URL '{}': {}", self.server_url, e))
        })?;
        if self.max_in_flight == 0 {
            return Err(WalkError::Configuration(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    // The REST API base: server URL without trailing slash, then the API
    // root wrapped in slashes
    //
    // Example:
    //   server_url = "https://example.com/", api_root = "api"
    //   result     = "https://example.com/api/"
    pub fn base_url(&self) -> String {
        let server = self.server_url.trim_end_matches('/');
        let root = self.api_root.trim_matches('/');
        if root.is_empty() {
            format!("{}/", server)
        } else {
            format!("{}/{}/", server, root)
        }
    }

    pub fn repositories_url(&self) -> String {
        format!("{}repositories/", self.base_url())
    }

    pub fn accepts_type(&self, repo_type: &str) -> bool {
        self.accepted_types.contains(repo_type)
    }
}
