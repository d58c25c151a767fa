// src/listing/mod.rs
// =============================================================================
// Everything about reading one directory page.
//
// Submodules:
// - autoindex: splits listing lines into name/timestamp/size/unit records
// - classify: decides whether a listed name is a directory or a leaf
// =============================================================================

mod autoindex;
mod classify;

pub use autoindex::{parse, parse_all, AutoindexEntry, Entries, Listing};
pub use classify::{is_directory, PATH_SEPARATOR};
