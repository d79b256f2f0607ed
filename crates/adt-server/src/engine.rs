//! Delivery engine: owns the current snapshot and rebuilds it on demand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use adt_compiler::compile_index;
use adt_core::{AdCampaign, IndexSet, IndexStats, MatchRequest, Matcher, SnapshotStore};

use crate::catalog::CatalogSource;
use crate::error::Result;

/// Process-scoped matching context shared by request handlers and the
/// background refresh tasks.
#[derive(Debug, Default)]
pub struct DeliveryEngine {
    store: SnapshotStore,
    next_build: AtomicU64,
}

impl DeliveryEngine {
    /// Create an engine serving the empty snapshot (build 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the catalog, compile it and publish the result.
    ///
    /// On error the previously published snapshot stays in service.
    pub async fn build_snapshot<S: CatalogSource>(&self, source: &S) -> Result<IndexStats> {
        let start = Instant::now();
        let entries = source.load_catalog().await?;

        let build_id = self.next_build.fetch_add(1, Ordering::Relaxed) + 1;
        let compiled = compile_index(&entries, build_id);
        let stats = compiled.index.stats();
        self.store.store(compiled.index);

        log::info!(
            "Rebuilt index {}: {} campaigns ({} active), {} rules skipped, {} duplicates dropped in {:.2}ms",
            build_id,
            stats.campaigns,
            stats.active,
            compiled.stats.skipped_rules,
            compiled.stats.duplicate_campaigns,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(stats)
    }

    /// Match against the current snapshot. Never fails and never blocks.
    pub fn match_request(&self, request: &MatchRequest) -> Vec<AdCampaign> {
        let index = self.store.load();
        Matcher::new(&index).match_request(request)
    }

    /// The snapshot currently in service.
    pub fn snapshot(&self) -> Arc<IndexSet> {
        self.store.load()
    }
}
