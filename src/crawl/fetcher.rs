// src/crawl/fetcher.rs
// =============================================================================
// Fetching and classifying one repository's manifest.
//
//   404                      NotFound    "ignore" entry, expected
//   other non-200            HttpError   "error" entry
//   200, not a JSON object   ParseError  "error" entry
//   200, private             Private     dropped without an entry
//   200, object              Success     "info" entry, record appended
//
// The fetcher is the only writer of new records. Many fetch tasks run at
// once and append straight into the shared catalog, which is safe because
// each append is atomic.
//
// Transport failures (connection refused, reset mid-body) are not outcomes:
// they get an "error" entry and come back as Err, so the dispatcher counts
// them as failed tasks.
// =============================================================================

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Map, Value};

use super::filter::FetchTarget;
use crate::catalog::{Catalog, ManifestRecord};
use crate::error::CrawlError;
use crate::github::{GitHubClient, ManifestResponse};
use crate::log::{EntryKind, LogEntry, LogSink};

// The five ways a manifest fetch can end
//
// #[derive(PartialEq)] lets tests compare outcomes directly
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Valid public manifest, ready for the catalog
    Success(ManifestRecord),
    /// The repository has no manifest file (404)
    NotFound,
    /// The raw endpoint answered with some other non-200 status
    HttpError(StatusCode),
    /// 200, but the body is not a JSON object; holds the reason
    ParseError(String),
    /// Valid manifest of a private repository
    Private,
}

// Everything one fetch task needs
//
// Cloned into every dispatched task. All three fields are handles (the client
// shares its pool, the other two are Arcs), so a clone is cheap.
#[derive(Clone)]
pub struct ManifestFetcher {
    client: GitHubClient,      // raw content requests
    catalog: Arc<Catalog>,     // where successes are appended
    log: Arc<dyn LogSink>,     // where the per-repository entry goes
}

impl ManifestFetcher {
    pub fn new(client: GitHubClient, catalog: Arc<Catalog>, log: Arc<dyn LogSink>) -> Self {
        Self {
            client,
            catalog,
            log,
        }
    }

    /// Downloads and classifies the manifest. Nothing is logged or stored.
    pub async fn fetch(&self, target: &FetchTarget) -> Result<FetchOutcome, CrawlError> {
        // Step 1: download (transport errors leave through `?`)
        let response = self
            .client
            .fetch_manifest(&target.account, &target.repo, &target.branch)
            .await?;

        let body = match response {
            ManifestResponse::Found(body) => body,
            ManifestResponse::NotFound => return Ok(FetchOutcome::NotFound),
            ManifestResponse::Failed(status) => return Ok(FetchOutcome::HttpError(status)),
        };

        // Step 2: the body must parse, and it must be an object; an array or
        // a bare string counts as a parse error
        let manifest = match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Ok(FetchOutcome::ParseError(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )))
            }
            Err(e) => return Ok(FetchOutcome::ParseError(e.to_string())),
        };

        // Step 3: private manifests and private repositories stay out
        if is_private(&manifest) || target.summary.private {
            return Ok(FetchOutcome::Private);
        }

        // Step 4: attach `repo` and `platform` to make the catalog record
        Ok(FetchOutcome::Success(ManifestRecord::new(
            manifest,
            &target.account,
            &target.summary,
        )))
    }

    /// Fetches the manifest, logs the outcome and appends successes to the
    /// catalog. Returns the outcome for the caller's bookkeeping.
    ///
    /// Exactly one repo entry is written per call, except for private
    /// repositories, which only leave a debug trace. A transport error is
    /// logged here too and then returned, so the dispatcher counts it.
    pub async fn crawl_repository(&self, target: &FetchTarget) -> Result<FetchOutcome, CrawlError> {
        let key = target.key();
        let filename = self.client.manifest_filename();
        let user = target.account.as_str();
        let repo = target.repo.as_str();

        let outcome = match self.fetch(target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.log.write(LogEntry::repo(
                    user,
                    repo,
                    EntryKind::Error,
                    format!("Error fetching \"{key}\"'s {filename}: {e}."),
                ));
                return Err(e);
            }
        };

        match &outcome {
            FetchOutcome::Success(record) => {
                // append() takes ownership; the outcome keeps its own copy
                // for the caller
                self.catalog.append(record.clone());
                self.log.write(LogEntry::repo(
                    user,
                    repo,
                    EntryKind::Info,
                    format!("Repository \"{key}\" has been updated."),
                ));
            }
            FetchOutcome::NotFound => self.log.write(LogEntry::repo(
                user,
                repo,
                EntryKind::Ignore,
                format!("Repository \"{key}\" does not have a {filename}."),
            )),
            FetchOutcome::HttpError(status) => self.log.write(LogEntry::repo(
                user,
                repo,
                EntryKind::Error,
                format!("Error fetching \"{key}\"'s {filename}: HTTP {}.", status.as_u16()),
            )),
            FetchOutcome::ParseError(reason) => self.log.write(LogEntry::repo(
                user,
                repo,
                EntryKind::Error,
                format!("Error parsing \"{key}\"'s {filename}: {reason}."),
            )),
            FetchOutcome::Private => {
                tracing::debug!(repo = %key, "Skipping private component");
            }
        }

        Ok(outcome)
    }
}

// Whether a manifest declares itself private
//
// Any "truthy" value counts, not only `true`: `1`, `"yes"` or `{}` all mark
// the manifest private. Absent, `null`, `false`, `0` and `""` do not.
fn is_private(manifest: &Map<String, Value>) -> bool {
    match manifest.get("private") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

// Short description of a JSON value's type, for parse error messages
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::github::RepositorySummary;
    use crate::log::{LogContext, MemorySink};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        server: MockServer,
        catalog: Arc<Catalog>,
        log: Arc<MemorySink>,
        fetcher: ManifestFetcher,
    }

    async fn harness() -> Harness {
        let server = MockServer::start().await;
        let base = format!("{}/", server.uri());
        let config = Config::from_lookup(|key| match key {
            "GITHUB_USERNAME" => Some("bot".to_string()),
            "GITHUB_PASSWORD" => Some("pw".to_string()),
            "GITHUB_API_URL" | "GITHUB_RAW_URL" => Some(base.clone()),
            _ => None,
        })
        .unwrap();
        let catalog = Arc::new(Catalog::in_memory());
        let log = Arc::new(MemorySink::new());
        let fetcher = ManifestFetcher::new(
            GitHubClient::new(&config).unwrap(),
            Arc::clone(&catalog),
            log.clone(),
        );
        Harness {
            server,
            catalog,
            log,
            fetcher,
        }
    }

    fn target(name: &str, private: bool) -> FetchTarget {
        let summary = RepositorySummary::from_item(&json!({
            "name": name,
            "size": 10,
            "default_branch": "main",
            "has_issues": true,
            "private": private
        }))
        .unwrap();
        FetchTarget::new("alice", summary).unwrap()
    }

    async fn serve(h: &Harness, repo: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("/alice/{repo}/main/component.json")))
            .respond_with(response)
            .mount(&h.server)
            .await;
    }

    #[tokio::test]
    async fn test_success_appends_record() {
        let h = harness().await;
        serve(&h, "x", ResponseTemplate::new(200).set_body_string(r#"{"name":"x"}"#)).await;

        let outcome = h.fetcher.crawl_repository(&target("X", false)).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Success(_)));

        let records = h.catalog.records_for("alice");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].repo(), Some("alice/x"));
        assert_eq!(records[0].get("name"), Some(&json!("x")));
        assert_eq!(h.log.count(LogContext::Repo, EntryKind::Info), 1);
    }

    #[tokio::test]
    async fn test_not_found_logs_one_ignore() {
        let h = harness().await;
        serve(&h, "x", ResponseTemplate::new(404)).await;

        let outcome = h.fetcher.crawl_repository(&target("x", false)).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotFound);
        assert!(h.catalog.is_empty());

        let entries = h.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Ignore);
        assert_eq!(entries[0].repo.as_deref(), Some("x"));
        assert!(entries[0].message.contains("component.json"));
    }

    #[tokio::test]
    async fn test_http_error_logs_error() {
        let h = harness().await;
        serve(&h, "x", ResponseTemplate::new(502)).await;

        let outcome = h.fetcher.crawl_repository(&target("x", false)).await.unwrap();
        assert_eq!(outcome, FetchOutcome::HttpError(StatusCode::BAD_GATEWAY));
        assert!(h.catalog.is_empty());
        assert_eq!(h.log.count(LogContext::Repo, EntryKind::Error), 1);
    }

    #[tokio::test]
    async fn test_non_object_body_is_parse_error() {
        let h = harness().await;
        serve(&h, "arr", ResponseTemplate::new(200).set_body_string("[1, 2]")).await;
        serve(&h, "junk", ResponseTemplate::new(200).set_body_string("<html>")).await;

        let outcome = h.fetcher.crawl_repository(&target("arr", false)).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::ParseError(ref m) if m.contains("an array")));
        let outcome = h.fetcher.crawl_repository(&target("junk", false)).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::ParseError(_)));

        assert!(h.catalog.is_empty());
        assert_eq!(h.log.count(LogContext::Repo, EntryKind::Error), 2);
    }

    #[tokio::test]
    async fn test_private_manifest_is_dropped_silently() {
        let h = harness().await;
        serve(
            &h,
            "secret",
            ResponseTemplate::new(200).set_body_string(r#"{"name":"secret","private":true}"#),
        )
        .await;

        let outcome = h.fetcher.crawl_repository(&target("secret", false)).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Private);
        assert!(h.catalog.is_empty());
        assert!(h.log.entries().is_empty());
    }

    #[test]
    fn test_private_flag_accepts_truthy_values() {
        let private = |value: Value| {
            let mut manifest = Map::new();
            manifest.insert("private".to_string(), value);
            is_private(&manifest)
        };
        assert!(private(json!(true)));
        assert!(private(json!(1)));
        assert!(private(json!("true")));
        assert!(private(json!({})));

        assert!(!private(json!(false)));
        assert!(!private(json!(0)));
        assert!(!private(json!("")));
        assert!(!private(Value::Null));
        assert!(!is_private(&Map::new()));
    }

    #[tokio::test]
    async fn test_private_as_number_is_dropped() {
        let h = harness().await;
        serve(
            &h,
            "one",
            ResponseTemplate::new(200).set_body_string(r#"{"name":"one","private":1}"#),
        )
        .await;

        let outcome = h.fetcher.crawl_repository(&target("one", false)).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Private);
        assert!(h.catalog.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_is_logged_and_returned() {
        // nothing listens on port 1
        let config = Config::from_lookup(|key| match key {
            "GITHUB_USERNAME" => Some("bot".to_string()),
            "GITHUB_PASSWORD" => Some("pw".to_string()),
            "GITHUB_RAW_URL" => Some("http://127.0.0.1:1/".to_string()),
            _ => None,
        })
        .unwrap();
        let catalog = Arc::new(Catalog::in_memory());
        let log = Arc::new(MemorySink::new());
        let fetcher = ManifestFetcher::new(
            GitHubClient::new(&config).unwrap(),
            Arc::clone(&catalog),
            log.clone(),
        );

        let err = fetcher.crawl_repository(&target("x", false)).await.unwrap_err();
        assert!(matches!(err, CrawlError::Transport(_)));
        assert!(catalog.is_empty());
        assert_eq!(log.count(LogContext::Repo, EntryKind::Error), 1);
    }

    #[tokio::test]
    async fn test_private_repository_is_dropped_silently() {
        let h = harness().await;
        serve(&h, "x", ResponseTemplate::new(200).set_body_string(r#"{"name":"x"}"#)).await;

        let outcome = h.fetcher.crawl_repository(&target("x", true)).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Private);
        assert!(h.catalog.is_empty());
        assert_eq!(h.log.count(LogContext::Repo, EntryKind::Error), 0);
    }
}
