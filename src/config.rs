// src/config.rs
// =============================================================================
// Runtime configuration, read from environment variables.
//
//   CONCURRENCY         max simultaneous manifest fetches (default 5)
//   GITHUB_USERNAME     basic-auth user        (required)
//   GITHUB_PASSWORD     basic-auth password    (required)
//   GITHUB_API_URL      search endpoint base   (default https://api.github.com)
//   GITHUB_RAW_URL      raw content base       (default https://raw.githubusercontent.com)
//   MANIFEST_FILENAME   file looked up in each repo (default component.json)
//   CATALOG_PATH        catalog JSON file      (default components.json)
//   RATE_LIMIT_RESERVE  search calls to keep in reserve (default 0)
//
// Both credentials must be present. A lone username or password would only
// produce confusing 401s halfway through a crawl, so it is rejected up front.
// =============================================================================

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_RAW_URL: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_MANIFEST_FILENAME: &str = "component.json";
pub const DEFAULT_CATALOG_PATH: &str = "components.json";

/// Basic-auth credential pair. The password never shows up in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// Everything a crawl needs to know before it starts
//
// Built once in main.rs; CLI flags may override `concurrency` and
// `catalog_path` afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub concurrency: usize,          // always >= 1
    pub credentials: Credentials,
    pub api_url: Url,                // always ends in '/'
    pub raw_url: Url,                // always ends in '/'
    pub manifest_filename: String,
    pub catalog_path: PathBuf,
    pub rate_limit_reserve: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        let username = get("GITHUB_USERNAME");
        let password = get("GITHUB_PASSWORD");
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Credentials { username, password },
            (None, _) => return Err(ConfigError::MissingCredential("GITHUB_USERNAME")),
            (Some(_), None) => return Err(ConfigError::MissingCredential("GITHUB_PASSWORD")),
        };

        Ok(Self {
            concurrency: parse_concurrency(get("CONCURRENCY").as_deref()),
            credentials,
            api_url: base_url("GITHUB_API_URL", get("GITHUB_API_URL"), DEFAULT_API_URL)?,
            raw_url: base_url("GITHUB_RAW_URL", get("GITHUB_RAW_URL"), DEFAULT_RAW_URL)?,
            manifest_filename: get("MANIFEST_FILENAME")
                .unwrap_or_else(|| DEFAULT_MANIFEST_FILENAME.to_string()),
            catalog_path: catalog_path_from(&get),
            rate_limit_reserve: get("RATE_LIMIT_RESERVE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        })
    }

    /// Just the catalog location, for commands that never talk to the network.
    pub fn catalog_path_from_env() -> PathBuf {
        Self::catalog_path_from_lookup(|key| std::env::var(key).ok())
    }

    /// Same blank-value rules as `from_lookup`, without requiring credentials.
    pub fn catalog_path_from_lookup<F>(lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        catalog_path_from(&|key: &str| non_blank(lookup(key)))
    }
}

// Empty and whitespace-only values count as unset
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// Shared by both entry points; `get` has already filtered blank values
fn catalog_path_from(get: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    get("CATALOG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH))
}

/// Anything that is not a positive integer falls back to the default.
fn parse_concurrency(value: Option<&str>) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_CONCURRENCY)
}

// Parses and checks one base URL setting
//
// Only http(s) URLs that can carry a path are accepted; `name` is the
// variable reported in the error.
fn base_url(name: &'static str, value: Option<String>, default: &str) -> Result<Url, ConfigError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    let invalid = || ConfigError::InvalidUrl {
        name,
        value: raw.clone(),
    };
    let mut url = Url::parse(&raw).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(invalid());
    }
    // Keep a trailing slash so path segments append instead of replacing.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
