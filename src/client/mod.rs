// src/client/mod.rs
// =============================================================================
// Talking to the repository manager.
//
// Submodules:
// - http: the PageSource trait and the authenticated reqwest-backed client
// - easing: the shared pacing gate applied before every request
// =============================================================================

mod easing;
mod http;

pub use easing::Easing;
pub use http::{BrmClient, Page, PageSource};
