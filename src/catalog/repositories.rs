// src/catalog/repositories.rs
// =============================================================================
// Loads the top-level repositories resource.
//
// The server answers GET {base}/repositories/ with a JSON array:
//
//   [{"key": "libs", "type": "LOCAL", "description": "...",
//     "url": "https://.../libs", "packageType": "Maven"}, ...]
//
// Only repositories whose type is in the accepted set are kept. Anything
// else (REMOTE caches, federated repos, ...) is dropped silently; that is a
// filtering choice, not an error.
//
// Rust concepts:
// - serde: Deserialize the per-element objects into a typed struct
// - BTreeMap: A sorted map, so the walk order is stable between runs
// =============================================================================

use crate::client::PageSource;
use crate::config::WalkerConfig;
use crate::error::{Result, WalkError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One repository from the catalog. Identity is `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub key: String,
    #[serde(rename = "type")]
    pub repo_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Root of the repository's directory tree; may be absent upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,
}

// Shape of one element in the remote array
#[derive(Debug, Deserialize)]
struct RemoteRepository {
    key: String,
    #[serde(rename = "type")]
    repo_type: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "packageType")]
    package_type: Option<String>,
}

// Fetches the catalog and keeps the accepted repositories
//
// Parameters:
//   source: where to fetch from (the real client or a test fixture)
//   config: provides the repositories URL and the accepted type set
//
// Returns: map of repository key -> Repository
//   Duplicate keys: the last one in the array wins
//
// Errors:
//   Any fetch error (the catalog is required for everything else)
//   WalkError::CatalogFormat when the body is not an array of objects
pub async fn load(
    source: &dyn PageSource,
    config: &WalkerConfig,
) -> Result<BTreeMap<String, Repository>> {
    let url = config.repositories_url();
    let page = source.fetch(&url, &[]).await?;

    let value = page
        .json_value()
        .map_err(|e| WalkError::CatalogFormat(format!("{} is not JSON: {}", url, e)))?;

    let repositories = filter_repositories(value, config)?;
    info!(
        count = repositories.len(),
        accepted = ?config.accepted_types,
        "Loaded repository catalog"
    );
    Ok(repositories)
}

// Same as `load`, but gives up with WalkError::Cancelled once `cancel` fires
pub async fn load_cancellable(
    source: &dyn PageSource,
    config: &WalkerConfig,
    cancel: &CancellationToken,
) -> Result<BTreeMap<String, Repository>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WalkError::Cancelled),
        result = load(source, config) => result,
    }
}

fn filter_repositories(
    value: Value,
    config: &WalkerConfig,
) -> Result<BTreeMap<String, Repository>> {
    let Value::Array(elements) = value else {
        return Err(WalkError::CatalogFormat(
            "repositories resource is not a JSON array".to_string(),
        ));
    };

    let mut repositories = BTreeMap::new();
    for (index, element) in elements.into_iter().enumerate() {
        if !element.is_object() {
            return Err(WalkError::CatalogFormat(format!(
                "element {} is not an object",
                index
            )));
        }

        let remote: RemoteRepository = serde_json::from_value(element).map_err(|e| {
            WalkError::CatalogFormat(format!("element {} is not a repository: {}", index, e))
        })?;

        let repo_type = remote.repo_type.unwrap_or_default();
        if !config.accepts_type(&repo_type) {
            debug!(key = %remote.key, %repo_type, "Skipping repository type");
            continue;
        }

        repositories.insert(
            remote.key.clone(),
            Repository {
                key: remote.key,
                repo_type,
                description: remote.description,
                url: remote.url,
                package_type: remote.package_type,
            },
        );
    }

    Ok(repositories)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is `let ... else`?
//    - Pattern-match or leave the function early
//    - `let Value::Array(elements) = value else { return Err(..) };`
//      binds `elements` only when the JSON is an array
//
// 2. Why Option<String> fields?
//    - The server may omit description, url or packageType
//    - serde maps a missing field to None instead of failing
//
// 3. Why `&dyn PageSource`?
//    - `dyn` means "any type implementing the trait", chosen at runtime
//    - The real client and the test fixture both fit, no generics needed
// -----------------------------------------------------------------------------
