// src/crawl/orchestrator.rs
// =============================================================================
// Crawling one account, start to finish.
//
//   Start      register the account, drop its old records
//   PagingLoop one search page at a time; each fetchable repository is
//              handed to the dispatcher without waiting for it; the rate
//              limit gate runs after every page
//   Draining   wait for every dispatched fetch
//   Committing flush the catalog
//   Done       log the elapsed time
//
// A search page that comes back 404 or non-200 ends the crawl on the spot:
// no drain, no flush. The account's old records are already gone by then and
// fetches still in flight are aborted, so the catalog holds only what
// finished before the failure. The next successful crawl of the account
// rebuilds it.
//
// Pages are requested strictly in order, one at a time. Fetches from
// different pages interleave freely.
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;  // .with_context() on the fetch task's Result

use super::dispatcher::{Dispatcher, DrainReport};
use super::fetcher::ManifestFetcher;
use super::filter::FetchTarget;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::CrawlError;
use crate::github::{GitHubClient, PageCursor, RateLimitGate, SearchResponse};
use crate::log::{EntryKind, LogEntry, LogSink};

/// Summary of a crawl that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub account: String,
    /// Search pages fetched
    pub pages: u32,
    /// Items across all pages, before filtering
    pub repositories_seen: usize,
    /// Items that passed the filter and got a fetch task
    pub dispatched: usize,
    /// How those fetch tasks ended
    pub fetches: DrainReport,
    /// Records the account has in the catalog after the crawl.
    pub records: usize,
    pub elapsed: Duration,
}

// The crawler
//
// Holds everything that outlives a single crawl. One Crawler can crawl many
// accounts, one after another or at the same time; per-crawl state (cursor,
// dispatcher, counters) lives on the stack of `crawl_account`.
pub struct Crawler {
    client: GitHubClient,   // search + raw requests
    catalog: Arc<Catalog>,  // shared with every fetch task
    log: Arc<dyn LogSink>,  // user and repo entries
    gate: RateLimitGate,    // runs between pages
    concurrency: usize,     // dispatcher limit for each crawl
}

impl Crawler {
    pub fn new(
        client: GitHubClient,
        catalog: Arc<Catalog>,
        log: Arc<dyn LogSink>,
        gate: RateLimitGate,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            catalog,
            log,
            gate,
            concurrency,
        }
    }

    // Builds a crawler with the client and the gate described by `config`
    pub fn from_config(
        config: &Config,
        catalog: Arc<Catalog>,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, CrawlError> {
        Ok(Self::new(
            GitHubClient::new(config)?,
            catalog,
            log,
            RateLimitGate::new(config.rate_limit_reserve),
            config.concurrency,
        ))
    }

    /// Crawls `account` and replaces its records in the catalog.
    ///
    /// Returns an error when the crawl ended early: the account does not
    /// exist, a search page failed, or the catalog could not be flushed.
    /// Failures of individual repositories never surface here.
    pub async fn crawl_account(&self, account: &str) -> Result<CrawlReport, CrawlError> {
        // Held until this function returns: a second crawl of the same
        // account waits here for this one to finish
        let _guard = self.catalog.lock_account(account).await;
        let start = Instant::now();

        // ---------------------------------------------------------------------
        // Start
        // ---------------------------------------------------------------------
        self.catalog.register_account(account);
        self.log.write(LogEntry::user(
            account,
            EntryKind::Info,
            format!("Updating \"{account}\"."),
        ));
        let removed = self.catalog.remove_all_for(account);
        tracing::debug!(account, removed, "Cleared previous records");

        // ---------------------------------------------------------------------
        // PagingLoop
        // ---------------------------------------------------------------------
        // One fetcher for the whole crawl; each task gets a clone
        let fetcher = ManifestFetcher::new(
            self.client.clone(),
            Arc::clone(&self.catalog),
            Arc::clone(&self.log),
        );
        // Dropped on every early return below, which aborts its tasks
        let mut dispatcher = Dispatcher::new(self.concurrency);
        tracing::debug!(account, limit = dispatcher.limit(), "Starting page loop");

        let mut cursor = PageCursor::first();
        let mut pages = 0;
        let mut repositories_seen = 0;
        let mut dispatched = 0;

        while cursor.has_more {
            // A transport error on a search page is as terminal as a bad status
            let response = match self.client.search_repositories(account, cursor.page).await {
                Ok(response) => response,
                Err(e) => {
                    self.log.write(LogEntry::user(
                        account,
                        EntryKind::Error,
                        format!("Error searching \"{account}\"'s repositories: {e}"),
                    ));
                    return Err(e);
                }
            };

            let page = match response {
                SearchResponse::Page(page) => page,
                SearchResponse::NotFound => {
                    self.log.write(LogEntry::user(
                        account,
                        EntryKind::Error,
                        format!("User \"{account}\" not found."),
                    ));
                    return Err(CrawlError::AccountNotFound(account.to_string()));
                }
                SearchResponse::Failed(status) => {
                    self.log.write(LogEntry::user(
                        account,
                        EntryKind::Error,
                        format!(
                            "Error searching \"{account}\"'s repositories: HTTP {}.",
                            status.as_u16()
                        ),
                    ));
                    return Err(CrawlError::PageFetch {
                        account: account.to_string(),
                        status,
                    });
                }
            };

            pages += 1;
            repositories_seen += page.items.len();
            let page_number = cursor.page;
            let item_count = page.items.len();

            // Hand every fetchable repository to the dispatcher. submit()
            // returns immediately; the fetches run while we move on.
            for summary in page.items {
                // None = filtered out (bare, no branch, or no issue tracker)
                let Some(target) = FetchTarget::new(account, summary) else {
                    continue;
                };
                let fetcher = fetcher.clone();
                let label = target.key();
                // `async move` takes ownership of the clone, the target and
                // the label, which makes the future 'static
                dispatcher.submit(label.clone(), async move {
                    fetcher
                        .crawl_repository(&target)
                        .await
                        .map(|_| ())  // the outcome is already logged
                        .with_context(|| format!("fetching manifest for {label}"))
                });
                dispatched += 1;
            }

            // Wait out the quota if needed, then look for a next page
            self.gate.await_quota(&page.headers).await;
            let links = cursor.advance(&page.headers);
            tracing::debug!(
                account,
                page = page_number,
                last_page = ?links.last_page,
                items = item_count,
                in_flight = dispatcher.pending(),
                "Fetched page"
            );
        }

        // ---------------------------------------------------------------------
        // Draining
        // ---------------------------------------------------------------------
        let fetches = dispatcher.drain().await;
        if fetches.failed > 0 {
            tracing::warn!(account, failed = fetches.failed, "Some manifest fetches failed");
        }

        // ---------------------------------------------------------------------
        // Committing
        // ---------------------------------------------------------------------
        if let Err(e) = self.catalog.flush().await {
            self.log.write(LogEntry::user(
                account,
                EntryKind::Error,
                format!("Error saving the catalog after updating \"{account}\": {e}"),
            ));
            return Err(CrawlError::Catalog(e));
        }

        // ---------------------------------------------------------------------
        // Done
        // ---------------------------------------------------------------------
        let elapsed = start.elapsed();
        self.log.write(LogEntry::user(
            account,
            EntryKind::Info,
            format!("Updated \"{account}\" in {} seconds.", elapsed.as_secs_f64().round()),
        ));

        Ok(CrawlReport {
            account: account.to_string(),
            pages,
            repositories_seen,
            dispatched,
            fetches,
            records: self.catalog.records_for(account).len(),
            elapsed,
        })
    }
}
