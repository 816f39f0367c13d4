use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashMap;
use mosaic_world::{ChunkCoord, TerrainColumns};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColumnCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Bounded LRU of column data for chunks that were demoted below HEIGHT,
/// so walking back toward them does not resample the noise.
pub struct ColumnCache {
    entries: HashMap<ChunkCoord, Arc<TerrainColumns>>,
    order: VecDeque<ChunkCoord>,
    capacity: usize,
    stats: ColumnCacheStats,
}

impl ColumnCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            stats: ColumnCacheStats::default(),
        }
    }

    /// Removes and returns the cached columns for `coord`.
    pub fn take(&mut self, coord: ChunkCoord) -> Option<Arc<TerrainColumns>> {
        match self.entries.remove(&coord) {
            Some(cols) => {
                self.stats.hits += 1;
                self.remove_from_order(coord);
                Some(cols)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, columns: Arc<TerrainColumns>) {
        if self.capacity == 0 {
            return;
        }
        let coord = columns.coord;
        if self.entries.insert(coord, columns).is_some() {
            self.remove_from_order(coord);
        }
        self.order.push_back(coord);
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                if self.entries.remove(&old).is_some() {
                    self.stats.evictions += 1;
                }
            }
        }
    }

    pub fn stats(&self) -> ColumnCacheStats {
        ColumnCacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }

    fn remove_from_order(&mut self, coord: ChunkCoord) {
        if let Some(pos) = self.order.iter().position(|c| *c == coord) {
            self.order.remove(pos);
        }
    }
}
