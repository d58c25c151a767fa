// src/logging.rs
// =============================================================================
// Structured logging setup.
//
// Library code only emits `tracing` events. The binary installs one
// subscriber here:
// - RUST_LOG wins when set, otherwise the --log-level flag applies
// - Output goes to stderr so stdout stays clean for --json
// =============================================================================

use crate::error::{Result, WalkError};
use tracing_subscriber::EnvFilter;

pub fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| WalkError::Configuration(format!("Invalid log level '{}': {}", level, e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| WalkError::Configuration(format!("Failed to initialise logging: {}", e)))
}
