// src/crawl/filter.rs
// =============================================================================
// Deciding which repositories are worth a manifest request.
//
// A repository is skipped, quietly, when it
// - is bare (size 0): there is nothing to fetch
// - has no default branch: there is nowhere to fetch from
// - has issues disabled: components are expected to take bug reports
// =============================================================================

use crate::github::RepositorySummary;

// The filter itself
//
// Pure function of the summary: no I/O, no logging.
pub fn should_fetch(summary: &RepositorySummary) -> bool {
    summary.size > 0
        // an empty string counts as "no branch"
        && summary
            .default_branch
            .as_deref()
            .is_some_and(|branch| !branch.is_empty())
        && summary.has_issues
}

/// Everything a manifest fetch needs, built only for repositories that pass
/// `should_fetch`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTarget {
    pub account: String,
    /// Lowercased repository name.
    pub repo: String,
    pub branch: String,
    pub summary: RepositorySummary,
}

impl FetchTarget {
    pub fn new(account: &str, summary: RepositorySummary) -> Option<Self> {
        if !should_fetch(&summary) {
            return None;
        }
        // should_fetch() guarantees a branch; `?` keeps that explicit
        let branch = summary.default_branch.clone()?;
        Some(Self {
            account: account.to_string(),
            repo: summary.lowercase_name(),
            branch,
            summary,
        })
    }

    /// `account/repo`, the catalog key of the record this target would
    /// produce.
    pub fn key(&self) -> String {
        format!("{}/{}", self.account, self.repo)
    }
}
