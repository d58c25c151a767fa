// src/walk/mod.rs
// =============================================================================
// Walking repository trees.
//
// Features:
// - Depth-unbounded traversal driven by a work queue
// - Cycle detection on normalised directory URLs, optional depth limit
// - Bounded concurrency, cooperative cancellation
// - Per-leaf sidecar digest collection
// - Per-node failure markers instead of aborting the whole walk
// =============================================================================

mod digest;
mod queue;
mod tree;

pub use digest::{collect, DigestKind, DigestSet};
pub use queue::{walk, walk_catalog, TreeWalker, ROOT_LEVEL};
pub use tree::{
    is_reserved_name, Directory, FailureReason, Leaf, NodeFailure, Tree, TreeNode, WalkStats,
    EDGE_KEY, FAILED_KEY, NODE_KEY,
};
