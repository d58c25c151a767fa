// src/snapshot.rs
// =============================================================================
// The snapshot document and its on-disk JSON form.
//
// A snapshot bundles everything one run produced:
// - when it ran and against which API base
// - the accepted repositories from the catalog
// - the walked tree (see walk::tree for the "@e"/"@n"/"@f" layout)
// - node counts
// =============================================================================

use crate::catalog::Repository;
use crate::error::Result;
use crate::walk::{Tree, WalkStats};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Human-readable timestamp format used in logs and snapshots.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FILE_TS_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub walked_at: String,
    pub base_url: String,
    pub repositories: BTreeMap<String, Repository>,
    pub tree: Tree,
    pub stats: WalkStats,
    #[serde(skip)]
    started: NaiveDateTime,
}

impl Snapshot {
    // Bundles a finished walk; the stats are recomputed from the tree
    pub fn new(base_url: &str, repositories: BTreeMap<String, Repository>, tree: Tree) -> Self {
        let started = Local::now().naive_local();
        let stats = tree.stats();
        Self {
            walked_at: naive_timestamp(Some(started)),
            base_url: base_url.to_string(),
            repositories,
            tree,
            stats,
            started,
        }
    }

    pub fn file_name(&self) -> String {
        format!("brm-tree-{}.json", self.started.format(FILE_TS_FORMAT))
    }
}

// Formats a timestamp (or now) as "YYYY-mm-dd HH:MM:SS", local time, no zone
pub fn naive_timestamp(timestamp: Option<NaiveDateTime>) -> String {
    timestamp
        .unwrap_or_else(|| Local::now().naive_local())
        .format(TS_FORMAT)
        .to_string()
}

// Writes the snapshot as pretty JSON into `dir`, creating it if needed
//
// Returns: the path of the written file
pub fn write_snapshot(dir: &Path, snapshot: &Snapshot) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(snapshot.file_name());
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&path, json)?;
    info!(path = %path.display(), "Snapshot written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::{Directory, TreeNode};
    use chrono::NaiveDate;

    fn small_tree() -> Tree {
        let mut tree = Tree::default();
        tree.insert(
            1,
            "https://example.com/api/data",
            TreeNode::Directory(Directory {
                url: "https://example.com/api/data".to_string(),
                edges: Vec::new(),
                children: BTreeMap::new(),
            }),
        );
        tree
    }

    #[test]
    fn test_naive_timestamp_now() {
        assert!(naive_timestamp(None).starts_with("20"));
    }

    #[test]
    fn test_naive_timestamp_given() {
        let ts = NaiveDate::from_ymd_opt(2019, 8, 22)
            .unwrap()
            .and_hms_opt(9, 53, 0)
            .unwrap();
        assert_eq!(naive_timestamp(Some(ts)), "2019-08-22 09:53:00");
    }

    #[test]
    fn test_write_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new("https://example.com/api/", BTreeMap::new(), small_tree());

        let path = write_snapshot(&dir.path().join("out"), &snapshot).unwrap();

        assert!(path.file_name().unwrap().to_string_lossy().starts_with("brm-tree-"));
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["base_url"], "https://example.com/api/");
        assert_eq!(value["stats"]["directories"], 1);
        assert_eq!(
            value["tree"]["1"]["https://example.com/api/data"]["@e"],
            serde_json::json!([])
        );
    }
}
