// src/github/mod.rs
// =============================================================================
// Everything that talks GitHub.
//
// - client:     authenticated search and raw-content requests
// - types:      repository summaries and link-field stripping
// - pagination: Link header parsing, the page cursor
// - rate_limit: waiting out an exhausted search quota between pages
// =============================================================================

mod client;
mod pagination;
mod rate_limit;
mod types;

pub use client::{GitHubClient, ManifestResponse, SearchPage, SearchResponse};
pub use pagination::{parse_link_header, LinkPagination, PageCursor};
pub use rate_limit::RateLimitGate;
pub use types::{strip_link_fields, RepositorySummary};
