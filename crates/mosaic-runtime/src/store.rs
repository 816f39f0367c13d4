//! Persistence collaborator: sparse per-chunk block overrides.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use mosaic_chunk::BlockOverride;
use mosaic_world::ChunkCoord;

/// Source of persisted voxel changes, consulted after block synthesis.
pub trait ChangeStore: Send + Sync {
    /// Overrides recorded for `coord`, or `None` when the chunk was never edited.
    fn overrides(&self, coord: ChunkCoord) -> Option<Vec<BlockOverride>>;
}

/// In-memory store, mostly for tests and the demo driver.
#[derive(Default)]
pub struct MemoryChangeStore {
    changes: RwLock<HashMap<ChunkCoord, Vec<BlockOverride>>>,
}

impl MemoryChangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, coord: ChunkCoord, change: BlockOverride) {
        let mut map = self.changes.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(coord).or_default().push(change);
    }

    /// A writer that panicked mid-push leaves whole entries behind, so reads
    /// go on through a poisoned lock.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ChunkCoord, Vec<BlockOverride>>> {
        self.changes.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChangeStore for MemoryChangeStore {
    fn overrides(&self, coord: ChunkCoord) -> Option<Vec<BlockOverride>> {
        self.read().get(&coord).cloned()
    }
}
