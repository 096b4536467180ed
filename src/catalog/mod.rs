// src/catalog/mod.rs
// =============================================================================
// The component catalog: every manifest found so far, across all crawled
// accounts, plus the list of accounts that have been crawled.
//
// Submodules:
// - record:  ManifestRecord, a manifest decorated with `repo` and `platform`
// - store:   Catalog, the shared in-memory store
// - persist: CatalogBackend and the JSON file backend
// =============================================================================

mod persist;
mod record;
mod store;

pub use persist::{CatalogBackend, CatalogSnapshot, JsonFileBackend, MemoryBackend};
pub use record::ManifestRecord;
pub use store::Catalog;
