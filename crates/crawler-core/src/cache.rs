//! In-memory snapshot cache.
//!
//! Holds the last successfully extracted [`BoostableBosses`]. Snapshots are
//! published as `Arc`s: a reader keeps its snapshot alive for as long as it
//! needs it, and a later [`SnapshotCache::store`] swaps in a new `Arc` without
//! touching the old one.

use crate::types::BoostableBosses;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Last-write-wins cache of the latest extraction.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    snapshot: RwLock<Arc<BoostableBosses>>,
}

impl SnapshotCache {
    /// Create an empty cache. [`load`](Self::load) returns the default value
    /// until the first store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot.
    pub async fn load(&self) -> Arc<BoostableBosses> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Replace the snapshot.
    pub async fn store(&self, bosses: BoostableBosses) -> Arc<BoostableBosses> {
        let snapshot = Arc::new(bosses);
        *self.snapshot.write().await = Arc::clone(&snapshot);
        snapshot
    }
}
