// src/error.rs
// =============================================================================
// Error types shared by every part of the walker.
//
// Two kinds of failure live here:
// - Fatal ones (bad configuration, unusable catalog) that abort a run
// - Per-request ones (HTTP status, timeouts, malformed listings) that the
//   tree walker turns into failure markers on individual nodes
//
// The binary wraps these in anyhow for reporting; the library keeps them
// typed so callers can tell the two kinds apart.
// =============================================================================

use thiserror::Error;

/// Everything that can go wrong while talking to the repository manager.
#[derive(Debug, Error)]
pub enum WalkError {
    /// Missing or unusable settings, raised before any request is made.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The repositories resource did not have the expected JSON shape.
    #[error("Catalog format error: {0}")]
    CatalogFormat(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// A directory listing line did not split into the expected fields.
    #[error("Malformed listing line {line:?}: expected {expected} fields, got {actual}")]
    MalformedListing {
        line: String,
        expected: usize,
        actual: usize,
    },

    #[error("Request timed out fetching {url}")]
    Timeout { url: String },

    /// Connection, TLS or body-read failures below the HTTP layer.
    #[error("Transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Walk cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WalkError {
    // Returns true when trying the same request again might succeed
    //
    // Timeouts, broken connections and 5xx answers are transient.
    // 4xx answers and parse failures will not change on a retry.
    pub fn is_transient(&self) -> bool {
        match self {
            WalkError::Timeout { .. } | WalkError::Transport { .. } => true,
            WalkError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, WalkError>;
