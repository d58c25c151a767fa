// src/walk/tree.rs
// =============================================================================
// The in-memory snapshot of a repository's directory tree.
//
// A node is one of:
// - Directory: child names in listing order plus one node per name
// - Leaf: a file with its listing row and sidecar digests
// - Failed: a subtree that could not be walked (fetch error, malformed page,
//   cycle, depth limit). Recorded as data so the rest of the tree survives.
//
// Nodes are built once, after all fetching is done, and never changed.
//
// Serialized layout (consumed by the snapshot writer):
//   directory -> {"@e": [names...], "<name>": <child>, ...}
//   leaf      -> {"@n": {"url", "name", "api_ts", "h_size", "h_unit",
//                        "md5", "sha1", "sha256"}}
//   failed    -> {"@f": {"url", "reason"}}
// =============================================================================

use crate::listing::AutoindexEntry;
use crate::walk::digest::DigestSet;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const EDGE_KEY: &str = "@e";
pub const NODE_KEY: &str = "@n";
pub const FAILED_KEY: &str = "@f";

// A child with one of these names would overwrite a record key
pub fn is_reserved_name(name: &str) -> bool {
    name == EDGE_KEY || name == NODE_KEY || name == FAILED_KEY
}

/// Why a subtree is missing from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The page could not be fetched (status, timeout, transport)
    Fetch(String),
    /// The page was fetched but its listing did not parse
    Listing(String),
    /// The URL resolves to a directory already being walked
    Cycle,
    /// Nested deeper than the configured maximum
    DepthLimit(usize),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Fetch(msg) => write!(f, "fetch failed: {}", msg),
            FailureReason::Listing(msg) => write!(f, "listing unparsable: {}", msg),
            FailureReason::Cycle => write!(f, "cycle: directory already visited"),
            FailureReason::DepthLimit(max) => write!(f, "maximum depth {} exceeded", max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub url: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub url: String,
    /// Child names exactly as listed, parent link excluded
    pub edges: Vec<String>,
    pub children: BTreeMap<String, TreeNode>,
}

impl Directory {
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.get(name)
    }

    // True when children holds exactly the listed names, recursively
    pub fn is_consistent(&self) -> bool {
        self.children.len() == self.edges.len()
            && self.edges.iter().all(|name| self.children.contains_key(name))
            && self.children.values().all(|child| match child {
                TreeNode::Directory(dir) => dir.is_consistent(),
                _ => true,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub url: String,
    pub metadata: Option<AutoindexEntry>,
    pub digests: DigestSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Directory(Directory),
    Leaf(Leaf),
    Failed(NodeFailure),
}

impl TreeNode {
    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            TreeNode::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            TreeNode::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_failure(&self) -> Option<&NodeFailure> {
        match self {
            TreeNode::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    // Counts the nodes of this subtree, this node included
    pub fn stats(&self) -> WalkStats {
        let mut stats = WalkStats::default();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                TreeNode::Directory(dir) => {
                    stats.directories += 1;
                    stack.extend(dir.children.values());
                }
                TreeNode::Leaf(_) => stats.leaves += 1,
                TreeNode::Failed(_) => stats.failed += 1,
            }
        }
        stats
    }
}

/// Node counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub directories: usize,
    pub leaves: usize,
    pub failed: usize,
}

impl WalkStats {
    /// Nodes that made it into the tree intact.
    pub fn walked(&self) -> usize {
        self.directories + self.leaves
    }

    pub fn merge(&mut self, other: WalkStats) {
        self.directories += other.directories;
        self.leaves += other.leaves;
        self.failed += other.failed;
    }
}

/// Roots per traversal level, keyed by repository URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tree {
    pub levels: BTreeMap<u32, BTreeMap<String, TreeNode>>,
}

impl Tree {
    pub fn insert(&mut self, level: u32, url: &str, node: TreeNode) {
        self.levels
            .entry(level)
            .or_default()
            .insert(url.to_string(), node);
    }

    pub fn get(&self, level: u32, url: &str) -> Option<&TreeNode> {
        self.levels.get(&level).and_then(|roots| roots.get(url))
    }

    pub fn stats(&self) -> WalkStats {
        let mut stats = WalkStats::default();
        for node in self.levels.values().flat_map(|roots| roots.values()) {
            stats.merge(node.stats());
        }
        stats
    }
}

#[derive(Serialize)]
struct LeafRecord<'a> {
    url: &'a str,
    #[serde(flatten)]
    metadata: Option<&'a AutoindexEntry>,
    #[serde(flatten)]
    digests: &'a DigestSet,
}

#[derive(Serialize)]
struct FailureRecord<'a> {
    url: &'a str,
    reason: String,
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TreeNode::Directory(dir) => {
                let mut map = serializer.serialize_map(Some(dir.edges.len() + 1))?;
                map.serialize_entry(EDGE_KEY, &dir.edges)?;
                for name in &dir.edges {
                    if let Some(child) = dir.children.get(name) {
                        map.serialize_entry(name, child)?;
                    }
                }
                map.end()
            }
            TreeNode::Leaf(leaf) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    NODE_KEY,
                    &LeafRecord {
                        url: &leaf.url,
                        metadata: leaf.metadata.as_ref(),
                        digests: &leaf.digests,
                    },
                )?;
                map.end()
            }
            TreeNode::Failed(failure) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    FAILED_KEY,
                    &FailureRecord {
                        url: &failure.url,
                        reason: failure.reason.to_string(),
                    },
                )?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(url: &str, name: &str) -> TreeNode {
        TreeNode::Leaf(Leaf {
            url: url.to_string(),
            metadata: Some(AutoindexEntry {
                name: name.to_string(),
                timestamp: "22-Aug-2019 09:53".to_string(),
                size: "2.50".to_string(),
                unit: "MB".to_string(),
            }),
            digests: DigestSet {
                md5: Some("m".to_string()),
                sha1: None,
                sha256: Some("s".to_string()),
            },
        })
    }

    fn sample() -> TreeNode {
        let mut b_children = BTreeMap::new();
        b_children.insert(
            "gone/".to_string(),
            TreeNode::Failed(NodeFailure {
                url: "https://example.com/api/data/b/gone/".to_string(),
                reason: FailureReason::Fetch("HTTP 404".to_string()),
            }),
        );
        let mut children = BTreeMap::new();
        children.insert(
            "a.txt".to_string(),
            leaf("https://example.com/api/data/a.txt", "a.txt"),
        );
        children.insert(
            "b/".to_string(),
            TreeNode::Directory(Directory {
                url: "https://example.com/api/data/b/".to_string(),
                edges: vec!["gone/".to_string()],
                children: b_children,
            }),
        );
        TreeNode::Directory(Directory {
            url: "https://example.com/api/data".to_string(),
            edges: vec!["a.txt".to_string(), "b/".to_string()],
            children,
        })
    }

    #[test]
    fn test_stats_count_every_kind() {
        let stats = sample().stats();
        assert_eq!(stats.directories, 2);
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.walked(), 3);
    }

    #[test]
    fn test_consistency_detects_orphans() {
        let node = sample();
        assert!(node.as_directory().unwrap().is_consistent());

        let mut dir = node.as_directory().unwrap().clone();
        dir.edges.pop();
        assert!(!dir.is_consistent());
    }

    #[test]
    fn test_serialized_layout() {
        let mut tree = Tree::default();
        tree.insert(1, "https://example.com/api/data", sample());

        let value = serde_json::to_value(&tree).unwrap();

        assert_eq!(
            value,
            json!({
                "1": {
                    "https://example.com/api/data": {
                        "@e": ["a.txt", "b/"],
                        "a.txt": {
                            "@n": {
                                "url": "https://example.com/api/data/a.txt",
                                "name": "a.txt",
                                "api_ts": "22-Aug-2019 09:53",
                                "h_size": "2.50",
                                "h_unit": "MB",
                                "md5": "m",
                                "sha256": "s"
                            }
                        },
                        "b/": {
                            "@e": ["gone/"],
                            "gone/": {
                                "@f": {
                                    "url": "https://example.com/api/data/b/gone/",
                                    "reason": "fetch failed: HTTP 404"
                                }
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_record_keys_are_reserved() {
        assert!(is_reserved_name("@e"));
        assert!(is_reserved_name("@n"));
        assert!(is_reserved_name("@f"));
        assert!(!is_reserved_name("@x"));
        assert!(!is_reserved_name("@e/"));
    }

    #[test]
    fn test_leaf_without_metadata_serializes_url_only() {
        let node = TreeNode::Leaf(Leaf {
            url: "https://example.com/x".to_string(),
            metadata: None,
            digests: DigestSet::default(),
        });
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"@n": {"url": "https://example.com/x"}})
        );
    }
}
