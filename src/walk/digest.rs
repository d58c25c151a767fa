// src/walk/digest.rs
// =============================================================================
// Sidecar digest collection.
//
// The repository manager publishes precomputed hashes next to every file:
//   {leaf}.md5, {leaf}.sha1, {leaf}.sha256
// We fetch each one and record its trimmed body as-is. No format check and
// no recomputation: the server's own sidecar files are the trust boundary.
//
// Each sidecar is independent. A missing .sha1 just means the DigestSet has
// no sha1 entry; the other two are still collected.
// =============================================================================

use crate::client::PageSource;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    Md5,
    Sha1,
    Sha256,
}

impl DigestKind {
    pub const ALL: [DigestKind; 3] = [DigestKind::Md5, DigestKind::Sha1, DigestKind::Sha256];

    /// File extension of the sidecar, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            DigestKind::Md5 => "md5",
            DigestKind::Sha1 => "sha1",
            DigestKind::Sha256 => "sha256",
        }
    }
}

/// Digests found for one leaf. Absent entries stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl DigestSet {
    pub fn get(&self, kind: DigestKind) -> Option<&str> {
        match kind {
            DigestKind::Md5 => self.md5.as_deref(),
            DigestKind::Sha1 => self.sha1.as_deref(),
            DigestKind::Sha256 => self.sha256.as_deref(),
        }
    }

    pub fn set(&mut self, kind: DigestKind, value: String) {
        match kind {
            DigestKind::Md5 => self.md5 = Some(value),
            DigestKind::Sha1 => self.sha1 = Some(value),
            DigestKind::Sha256 => self.sha256 = Some(value),
        }
    }

    pub fn len(&self) -> usize {
        DigestKind::ALL
            .iter()
            .filter(|kind| self.get(**kind).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Fetches the three sidecars of one leaf
//
// Parameters:
//   source: page source used for the sidecar GETs
//   leaf_url: full URL of the leaf, without any extension
//
// Never fails; unreachable sidecars are simply left out.
pub async fn collect(source: &dyn PageSource, leaf_url: &str) -> DigestSet {
    let mut digests = DigestSet::default();

    for kind in DigestKind::ALL {
        let url = format!("{}.{}", leaf_url, kind.extension());
        match source.fetch(&url, &[]).await {
            Ok(page) => digests.set(kind, page.body.trim().to_string()),
            Err(e) => debug!(%url, error = %e, "No sidecar digest"),
        }
    }

    digests
}
