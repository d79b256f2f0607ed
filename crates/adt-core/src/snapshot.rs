//! Lock-free snapshot container
//!
//! Holds exactly one current [`IndexSet`]. Writers publish a fully built
//! replacement with a single pointer swap; readers load the current one
//! without taking a lock and keep using it for as long as they hold the
//! returned `Arc`, even after a newer set is published. A superseded set is
//! freed when its last reader drops it.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::index::IndexSet;

/// Single-slot, atomically replaceable holder of the current index set.
pub struct SnapshotStore {
    current: ArcSwap<IndexSet>,
}

impl SnapshotStore {
    /// Create a store holding the empty index set.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(IndexSet::empty()),
        }
    }

    /// Publish a new index set. Concurrent stores are last-write-wins.
    pub fn store(&self, index: IndexSet) {
        let build_id = index.build_id();
        let campaigns = index.len();
        self.current.store(Arc::new(index));
        log::debug!("published index build {} ({} campaigns)", build_id, campaigns);
    }

    /// Load the current index set. Never blocks.
    #[inline]
    pub fn load(&self) -> Arc<IndexSet> {
        self.current.load_full()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.load();
        f.debug_struct("SnapshotStore")
            .field("build_id", &current.build_id())
            .field("campaigns", &current.len())
            .finish()
    }
}
