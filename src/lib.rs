// src/lib.rs
// =============================================================================
// component-crawler: finds component.json manifests across a GitHub account's
// repositories and keeps them in a shared catalog.
//
// The binary (src/main.rs) wires these modules together; everything here is
// usable on its own, which is also how the tests drive it.
// =============================================================================

pub mod catalog;
pub mod config;
pub mod crawl;
pub mod error;
pub mod github;
pub mod log;
