//! Catalog sources
//!
//! The catalog source is the authoritative store of campaigns. It is read in
//! full on every rebuild, possibly by several rebuilds at once.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use adt_compiler::{parse_catalog_json, CatalogEntry};

use crate::error::{Result, ServiceError};

/// Authoritative campaign catalog.
pub trait CatalogSource: Send + Sync {
    /// Load every campaign with its raw rules.
    fn load_catalog(&self) -> impl Future<Output = Result<Vec<CatalogEntry>>> + Send;
}

// =============================================================================
// File Catalog
// =============================================================================

/// Catalog stored as a JSON array of entries in a file.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for FileCatalog {
    async fn load_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ServiceError::CatalogUnavailable(format!(
                "Failed to read '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        parse_catalog_json(&text).map_err(|e| {
            ServiceError::CatalogUnavailable(format!("'{}': {}", self.path.display(), e))
        })
    }
}

// =============================================================================
// Memory Catalog
// =============================================================================

/// In-process catalog whose contents can be swapped or made to fail.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<Vec<CatalogEntry>>,
    unavailable: AtomicBool,
    loads: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            ..Self::default()
        }
    }

    /// Replace the catalog contents seen by subsequent loads.
    pub fn replace(&self, entries: Vec<CatalogEntry>) {
        match self.entries.write() {
            Ok(mut guard) => *guard = entries,
            Err(poisoned) => *poisoned.into_inner() = entries,
        }
    }

    /// Make subsequent loads fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of load attempts so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl CatalogSource for MemoryCatalog {
    async fn load_catalog(&self) -> Result<Vec<CatalogEntry>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::CatalogUnavailable(
                "memory catalog marked unavailable".to_string(),
            ));
        }
        self.entries
            .read()
            .map(|entries| entries.clone())
            .map_err(|_| ServiceError::CatalogUnavailable("catalog lock poisoned".to_string()))
    }
}
