// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Every connection setting can come from a flag or from the environment
// (BRM_SERVER, BRM_API_ROOT, BRM_USER, BRM_TOKEN, BRM_FS_ROOT, BRM_WAIT),
// so the tool runs unchanged in CI jobs that only export variables.
//
// The CLI is the only place that knows about the environment; it turns the
// parsed arguments into a WalkerConfig for the library.
// =============================================================================

use brm_walk::config::{RetryPolicy, WalkerConfig, DEFAULT_ACCEPTED_TYPES, DEFAULT_MAX_DEPTH};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "brm-walk",
    version,
    about = "Snapshot the directory tree of a binary repository manager",
    long_about = "brm-walk lists the repositories of a binary repository manager, walks their \
                  autoindex directory pages and records every file with its listing metadata \
                  and sidecar MD5/SHA1/SHA256 digests as one JSON snapshot."
)]
pub struct Cli {
    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the repositories that would be walked
    ///
    /// Example: brm-walk repositories --server https://artifacts.example.com --api-root api
    Repositories {
        #[command(flatten)]
        server: ServerArgs,

        /// Output the catalog as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Walk every accepted repository and write a snapshot
    ///
    /// Example: brm-walk walk --out-dir snapshots --concurrency 4
    Walk {
        #[command(flatten)]
        server: ServerArgs,

        #[command(flatten)]
        walk: WalkArgs,

        /// Directory the snapshot file is written to
        #[arg(long, env = "BRM_FS_ROOT", default_value = ".")]
        out_dir: PathBuf,

        /// Print the snapshot to stdout instead of writing a file
        #[arg(long)]
        json: bool,
    },
}

/// Where the server is and how to authenticate.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Server URL (e.g., https://artifacts.example.com)
    #[arg(long, env = "BRM_SERVER")]
    pub server: String,

    /// REST API root below the server URL
    #[arg(long, env = "BRM_API_ROOT", default_value = "/")]
    pub api_root: String,

    #[arg(long, env = "BRM_USER", default_value = "")]
    pub user: String,

    /// API token (used as the basic-auth password)
    #[arg(long, env = "BRM_TOKEN", default_value = "", hide_env_values = true)]
    pub token: String,

    /// Repository types to keep; repeat the flag for several
    #[arg(long = "accept", value_name = "TYPE")]
    pub accepted_types: Vec<String>,

    /// Upper bound of the random pause before each request, in milliseconds
    #[arg(long, env = "BRM_WAIT", default_value_t = 0)]
    pub wait_ms: u64,

    /// Minimum spacing between request starts, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub min_interval_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retries for timeouts, connection errors and 5xx answers
    #[arg(long, default_value_t = 2)]
    pub retries: u32,
}

/// Traversal limits.
#[derive(Args, Debug, Clone)]
pub struct WalkArgs {
    /// Maximum directory nesting below a repository root
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, conflicts_with = "unbounded")]
    pub max_depth: usize,

    /// Walk without a depth limit (cycles are still detected)
    #[arg(long)]
    pub unbounded: bool,

    /// Maximum number of requests in flight
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,
}

impl ServerArgs {
    // Builds the library configuration from the parsed flags
    pub fn to_config(&self) -> WalkerConfig {
        let mut config = WalkerConfig::new(&self.server, &self.api_root, &self.user, &self.token);
        config.max_wait = Duration::from_millis(self.wait_ms);
        config.min_interval = Duration::from_millis(self.min_interval_ms);
        config.request_timeout = Duration::from_secs(self.timeout_secs);
        config.retry = RetryPolicy {
            max_retries: self.retries,
            ..RetryPolicy::default()
        };
        config.accepted_types = if self.accepted_types.is_empty() {
            DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect()
        } else {
            self.accepted_types
                .iter()
                .map(|t| t.to_uppercase())
                .collect()
        };
        config
    }
}

impl WalkArgs {
    pub fn apply(&self, config: &mut WalkerConfig) {
        config.max_depth = if self.unbounded {
            None
        } else {
            Some(self.max_depth)
        };
        config.max_in_flight = self.concurrency;
    }
}
