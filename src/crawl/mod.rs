// src/crawl/mod.rs
// =============================================================================
// Crawling an account for component manifests.
//
// Submodules:
// - filter:       which repositories are worth a manifest request
// - fetcher:      fetching and classifying one manifest
// - dispatcher:   the bounded pool the fetches run in
// - orchestrator: paging through an account and committing the result
// =============================================================================

mod dispatcher;
mod fetcher;
mod filter;
mod orchestrator;

pub use dispatcher::{Dispatcher, DrainReport};
pub use fetcher::{FetchOutcome, ManifestFetcher};
pub use filter::{should_fetch, FetchTarget};
pub use orchestrator::{CrawlReport, Crawler};
