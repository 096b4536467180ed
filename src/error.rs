// src/error.rs
// =============================================================================
// Error types for the library side of the crawler.
//
// The binary works with anyhow::Result and adds context; the library keeps
// typed errors so callers can tell "account not found" apart from
// "the catalog file is corrupt".
// =============================================================================

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required (GITHUB_USERNAME and GITHUB_PASSWORD must both be set)")]
    MissingCredential(&'static str),

    #[error("{name} is not a valid base URL: {value}")]
    InvalidUrl { name: &'static str, value: String },
}

/// Errors that end a crawl early, or fail a single request.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("account \"{0}\" not found")]
    AccountNotFound(String),

    #[error("searching repositories of \"{account}\" failed with HTTP {status}")]
    PageFetch { account: String, status: StatusCode },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("cannot build a request URL from base {0}")]
    InvalidBaseUrl(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors from loading or saving the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog file {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_account() {
        let err = CrawlError::AccountNotFound("bob".to_string());
        assert_eq!(err.to_string(), "account \"bob\" not found");

        let err = CrawlError::PageFetch {
            account: "bob".to_string(),
            status: StatusCode::BAD_GATEWAY,
        };
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_missing_credential_names_variable() {
        let err = ConfigError::MissingCredential("GITHUB_PASSWORD");
        assert!(err.to_string().starts_with("GITHUB_PASSWORD is required"));
    }
}
