// src/catalog/persist.rs
// =============================================================================
// Durable storage for the catalog.
//
// The catalog only knows the `CatalogBackend` trait. The real backend writes a
// JSON file shaped like
//
//   { "users": ["alice", ...], "components": [{ ...manifest... }, ...] }
//
// and replaces it atomically (write a sibling temp file, then rename) so an
// interrupted save never leaves a half-written catalog behind.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use super::record::ManifestRecord;
use crate::error::CatalogError;

/// Everything the catalog holds, in the on-disk layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]  // older files may lack either key
    pub users: Vec<String>,
    #[serde(default)]
    pub components: Vec<ManifestRecord>,
}

// Where flushes go
//
// An async fn cannot sit in a trait used as `dyn CatalogBackend`, so `save`
// returns a boxed future instead. Implementations write the body as
// `async move { ... }.boxed()`.
pub trait CatalogBackend: Send + Sync {
    fn save<'a>(&'a self, snapshot: &'a CatalogSnapshot) -> BoxFuture<'a, Result<(), CatalogError>>;
}

// The real backend: one JSON file on disk
//
// Saves must not overlap: they share one temp file. `Catalog::flush`
// serializes them.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the catalog file. A file that does not exist yet is an empty
    /// catalog.
    pub async fn load(&self) -> Result<CatalogSnapshot, CatalogError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CatalogSnapshot::default())
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| CatalogError::Json {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, snapshot: &CatalogSnapshot) -> Result<(), CatalogError> {
        let io_err = |source: std::io::Error| CatalogError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(snapshot).map_err(|source| CatalogError::Json {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // "components.json" -> "components.json.tmp", in the same directory
        // so the rename below stays on one filesystem
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

impl CatalogBackend for JsonFileBackend {
    fn save<'a>(&'a self, snapshot: &'a CatalogSnapshot) -> BoxFuture<'a, Result<(), CatalogError>> {
        async move {
            self.write(snapshot).await?;
            tracing::debug!(
                path = %self.path.display(),
                components = snapshot.components.len(),
                "Catalog saved"
            );
            Ok(())
        }
        .boxed()
    }
}

/// Keeps the last saved snapshot in memory and counts saves. Used by
/// `Catalog::in_memory` and throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    saves: AtomicUsize,
    last: Mutex<Option<CatalogSnapshot>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn last_saved(&self) -> Option<CatalogSnapshot> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CatalogBackend for MemoryBackend {
    fn save<'a>(&'a self, snapshot: &'a CatalogSnapshot) -> BoxFuture<'a, Result<(), CatalogError>> {
        async move {
            *self
                .last
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot.clone());
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> CatalogSnapshot {
        serde_json::from_value(json!({
            "users": ["alice"],
            "components": [{ "name": "x", "repo": "alice/x" }]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nope.json"));
        assert_eq!(backend.load().await.unwrap(), CatalogSnapshot::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested/components.json"));
        backend.save(&snapshot()).await.unwrap();

        assert_eq!(backend.load().await.unwrap(), snapshot());
        assert!(!dir.path().join("nested/components.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("components.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileBackend::new(&path).load().await.unwrap_err();
        assert!(matches!(err, CatalogError::Json { .. }));
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("components.json");
        std::fs::write(&path, r#"{ "users": ["bob"] }"#).unwrap();

        let loaded = JsonFileBackend::new(&path).load().await.unwrap();
        assert_eq!(loaded.users, vec!["bob".to_string()]);
        assert!(loaded.components.is_empty());
    }

    #[tokio::test]
    async fn test_memory_backend_counts_saves() {
        let backend = MemoryBackend::new();
        backend.save(&snapshot()).await.unwrap();
        backend.save(&CatalogSnapshot::default()).await.unwrap();
        assert_eq!(backend.save_count(), 2);
        assert_eq!(backend.last_saved(), Some(CatalogSnapshot::default()));
    }
}
