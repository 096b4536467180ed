// src/github/client.rs
// =============================================================================
// Authenticated access to the two GitHub endpoints the crawler needs:
//
//   search:  GET {api}/search/repositories?q=fork:true user:{account}&page={n}
//   raw:     GET {raw}/{account}/{repo}/{branch}/{manifest}
//
// Both calls classify the response status themselves. Whenever a response is
// not going to be decoded, its body is read to the end before returning so
// the pooled connection can be reused.
// =============================================================================

use std::sync::Arc;

use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::types::RepositorySummary;
use crate::config::{Config, Credentials};
use crate::error::CrawlError;

// GitHub rejects API requests without a User-Agent
// concat! + env! build "component-crawler/0.1.0" at compile time
const USER_AGENT_VALUE: &str = concat!("component-crawler/", env!("CARGO_PKG_VERSION"));

/// One successfully fetched page of search results.
#[derive(Debug)]
pub struct SearchPage {
    pub items: Vec<RepositorySummary>,
    /// Kept for the Link header and the rate-limit headers.
    pub headers: HeaderMap,
}

// What a search request came back with
//
// Only transport problems and undecodable 200 bodies are errors (`Err`);
// every HTTP status is a normal answer the orchestrator decides about.
#[derive(Debug)]
pub enum SearchResponse {
    /// 200 OK with a decoded list of repositories
    Page(SearchPage),
    /// 404: the account does not exist
    NotFound,
    /// Any other status (422, 403, 5xx, ...)
    Failed(StatusCode),
}

// What a raw manifest request came back with
//
// The body is handed back undecoded: telling "not JSON" apart from "not an
// object" is the fetcher's job.
#[derive(Debug)]
pub enum ManifestResponse {
    Found(Vec<u8>),      // 200, raw bytes of the file
    NotFound,            // 404, the repository has no manifest
    Failed(StatusCode),  // anything else
}

// Shape of the search response body
//
// Items stay as raw JSON here; each one is stripped and decoded on its own
// so a single odd item cannot fail the whole page.
#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]  // a body without "items" is an empty page
    items: Vec<Value>,
}

// The HTTP client for both endpoints
//
// Cheap to clone; clones share the connection pool. Every fetch task gets
// its own clone. The credentials and the file name sit behind an Arc so a
// clone copies pointers, not strings.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,                   // reqwest's pooled client
    credentials: Arc<Credentials>,  // basic auth on every request
    api_url: Url,                   // base of the search endpoint
    raw_url: Url,                   // base of the raw content endpoint
    manifest_filename: Arc<str>,    // e.g. "component.json"
}

impl GitHubClient {
    // Builds the client from configuration
    //
    // Fails only if reqwest cannot set up its TLS backend.
    pub fn new(config: &Config) -> Result<Self, CrawlError> {
        let http = Client::builder().user_agent(USER_AGENT_VALUE).build()?;
        Ok(Self {
            http,
            credentials: Arc::new(config.credentials.clone()),
            api_url: config.api_url.clone(),
            raw_url: config.raw_url.clone(),
            manifest_filename: Arc::from(config.manifest_filename.as_str()),
        })
    }

    pub fn manifest_filename(&self) -> &str {
        &self.manifest_filename
    }

    /// Fetches one page of the account's repositories, forks included.
    ///
    /// Steps:
    /// 1. Build `{api}/search/repositories?q=fork:true user:{account}&page={n}`
    /// 2. Send it with basic auth and the GitHub JSON media type
    /// 3. Classify the status (404 / other non-200 / 200)
    /// 4. On 200, decode the items and keep the headers for paging and the
    ///    rate-limit gate
    pub async fn search_repositories(
        &self,
        account: &str,
        page: u32,
    ) -> Result<SearchResponse, CrawlError> {
        let mut url = join_segments(&self.api_url, ["search", "repositories"])?;
        // query_pairs_mut() form-encodes the values: the space in the query
        // is sent as '+', just as GitHub expects
        url.query_pairs_mut()
            .append_pair("q", &format!("fork:true user:{account}"))
            .append_pair("page", &page.to_string());

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            drain(response).await;
            return Ok(SearchResponse::NotFound);
        }
        if status != StatusCode::OK {
            drain(response).await;
            return Ok(SearchResponse::Failed(status));
        }

        // .json() consumes the response, so the headers are copied out first
        let headers = response.headers().clone();
        let body: SearchBody = response
            .json()
            .await
            .map_err(|e| CrawlError::Decode(format!("search page {page} for {account}: {e}")))?;

        // Decode item by item; a broken item is logged and skipped
        let mut items = Vec::with_capacity(body.items.len());
        for item in &body.items {
            match RepositorySummary::from_item(item) {
                Ok(summary) => items.push(summary),
                Err(e) => tracing::warn!(account, page, error = %e, "Skipping search item"),
            }
        }

        Ok(SearchResponse::Page(SearchPage { items, headers }))
    }

    /// Reads the manifest file from a repository branch. `repo` should
    /// already be lowercased.
    pub async fn fetch_manifest(
        &self,
        account: &str,
        repo: &str,
        branch: &str,
    ) -> Result<ManifestResponse, CrawlError> {
        // Branch names may contain slashes; each part is its own segment.
        let segments = [account, repo]
            .into_iter()
            .chain(branch.split('/'))
            .chain([&*self.manifest_filename]);
        let url = join_segments(&self.raw_url, segments)?;

        let response = self
            .http
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;

        match response.status() {
            // bytes() reads the whole body; a connection dropped halfway is
            // a transport error, not a parse error
            StatusCode::OK => Ok(ManifestResponse::Found(response.bytes().await?.to_vec())),
            StatusCode::NOT_FOUND => {
                drain(response).await;
                Ok(ManifestResponse::NotFound)
            }
            status => {
                drain(response).await;
                Ok(ManifestResponse::Failed(status))
            }
        }
    }
}

// Appends path segments to a base URL
//
// path_segments_mut() percent-encodes each segment on its own, so a '/' or a
// space inside a repository name can never change the shape of the path.
// It fails only for "cannot-be-a-base" URLs such as `mailto:`, which config
// validation already rules out.
//
// pop_if_empty() removes the empty segment left by the base URL's trailing
// slash, so "https://host/" + ["a"] gives "https://host/a", not "//a".
fn join_segments<'a>(
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, CrawlError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CrawlError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Reads and discards the rest of a response body. A failure here only
/// costs the connection, so it is not reported.
async fn drain(response: reqwest::Response) {
    let _ = response.bytes().await;
}
