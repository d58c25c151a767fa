// src/catalog/mod.rs
// =============================================================================
// The repository catalog: which repositories exist and where they live.
//
// Currently implements:
// - Fetching {base}/repositories/ through any PageSource
// - Keeping only repositories of an accepted type (LOCAL and VIRTUAL unless
//   configured otherwise)
// =============================================================================

mod repositories;

pub use repositories::{load, load_cancellable, Repository};
