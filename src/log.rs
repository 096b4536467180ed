// src/log.rs
// =============================================================================
// The crawl log.
//
// Crawl health is reported as a stream of small entries, one per notable
// event: an account starting or finishing, a repository with no manifest, a
// manifest that failed to download. Operators read these to see which
// repositories were picked up and why the others were not.
//
// Writing an entry never blocks the crawl and never fails it. The default
// sink forwards to `tracing`. `MemorySink` keeps entries for `--log-file`
// and for tests that inspect what was written.
// =============================================================================

use std::sync::{Arc, Mutex};

use serde::Serialize;

/// What an entry is about: a whole account or one of its repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogContext {
    User,
    Repo,
}

/// Severity of an entry. `Ignore` marks an expected skip, such as a
/// repository that simply has no manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Info,
    Error,
    Ignore,
}

// One log entry
//
// Serialized as
//   {"context":"repo","user":"alice","repo":"x","type":"ignore","message":"..."}
// which is also the line format of --log-file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub context: LogContext,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]  // absent for user entries
    pub repo: Option<String>,
    #[serde(rename = "type")]  // `type` is a keyword in Rust
    pub kind: EntryKind,
    pub message: String,
}

impl LogEntry {
    pub fn user(user: &str, kind: EntryKind, message: impl Into<String>) -> Self {
        Self {
            context: LogContext::User,
            user: user.to_string(),
            repo: None,
            kind,
            message: message.into(),
        }
    }

    pub fn repo(user: &str, repo: &str, kind: EntryKind, message: impl Into<String>) -> Self {
        Self {
            context: LogContext::Repo,
            user: user.to_string(),
            repo: Some(repo.to_string()),
            kind,
            message: message.into(),
        }
    }
}

// Anything that accepts log entries
//
// Send + Sync because fetch tasks on any runtime thread write through a
// shared `Arc<dyn LogSink>`. `write` returns nothing: a sink that cannot
// record an entry drops it.
pub trait LogSink: Send + Sync {
    fn write(&self, entry: LogEntry);
}

// Lets an Arc<MemorySink> be used as a sink while the caller keeps its own
// handle for reading entries back
impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write(&self, entry: LogEntry) {
        (**self).write(entry);
    }
}

/// Forwards entries to `tracing` as structured events.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, entry: LogEntry) {
        let repo = entry.repo.as_deref().unwrap_or("");
        match entry.kind {
            EntryKind::Info => tracing::info!(
                context = ?entry.context,
                user = %entry.user,
                repo,
                "{}",
                entry.message
            ),
            EntryKind::Ignore => tracing::debug!(
                context = ?entry.context,
                user = %entry.user,
                repo,
                "{}",
                entry.message
            ),
            EntryKind::Error => tracing::error!(
                context = ?entry.context,
                user = %entry.user,
                repo,
                "{}",
                entry.message
            ),
        }
    }
}

/// Keeps every entry in memory, in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, context: LogContext, kind: EntryKind) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.context == context && e.kind == kind)
            .count()
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}

/// Writes every entry to both sinks.
pub struct TeeSink<A, B>(pub A, pub B);

impl<A: LogSink, B: LogSink> LogSink for TeeSink<A, B> {
    fn write(&self, entry: LogEntry) {
        self.0.write(entry.clone());
        self.1.write(entry);
    }
}
