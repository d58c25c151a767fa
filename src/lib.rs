// src/lib.rs
// =============================================================================
// brm-walk: snapshot the REST-exposed directory tree of a binary repository
// manager.
//
// Control flow:
//   catalog::load -> walk::walk_catalog -> snapshot::write_snapshot
//
// Modules:
// - config: WalkerConfig, built by the caller and passed in
// - client: PageSource trait and the authenticated HTTP client
// - listing: autoindex page parsing and directory/leaf classification
// - catalog: the filtered repositories resource
// - walk: the tree walker, digest collection and the tree model
// - snapshot: the serialised result document
// =============================================================================

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod listing;
pub mod logging;
pub mod snapshot;
pub mod walk;

#[cfg(test)]
mod test_utils;

pub use error::{Result, WalkError};
