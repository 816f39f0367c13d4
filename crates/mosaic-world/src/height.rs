//! Column heights and terrain kinds derived from the cell field.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use mosaic_blocks::BlockKind;
use rayon::prelude::*;

use crate::cells::{CellId, CellNoiseField};
use crate::config::{HeightParams, TerrainConfig, TerrainParams};
use crate::coord::ChunkCoord;

/// Extra columns sampled on every side of a chunk so slope and bounds
/// derivation never has to consult another chunk.
pub const COLUMN_BORDER: i32 = 2;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColumnSample {
    /// Y of the topmost solid voxel.
    pub height: i32,
    pub kind: BlockKind,
    pub cell: CellId,
    pub edge_distance: f32,
}

/// Pure per-column height function shared by every chunk.
pub struct HeightField {
    cells: CellNoiseField,
    detail: FastNoiseLite,
    height: HeightParams,
    terrain: TerrainParams,
    height_limit: i32,
}

impl HeightField {
    pub fn new(cfg: &TerrainConfig) -> Self {
        let mut detail = FastNoiseLite::with_seed(cfg.cells.seed ^ 0x3C6E_F372);
        detail.set_noise_type(Some(NoiseType::OpenSimplex2));
        detail.set_frequency(Some(cfg.height.detail_frequency));
        Self {
            cells: CellNoiseField::new(&cfg.cells),
            detail,
            height: cfg.height.clone(),
            terrain: cfg.terrain.clone(),
            height_limit: cfg.chunk.height_limit,
        }
    }

    #[inline]
    pub fn cells(&self) -> &CellNoiseField {
        &self.cells
    }

    #[inline]
    pub fn height_limit(&self) -> i32 {
        self.height_limit
    }

    /// Highest allowed surface; leaves one air layer under the limit.
    #[inline]
    fn max_surface(&self) -> i32 {
        (self.height_limit - 2).max(1)
    }

    pub fn column(&self, wx: i32, wz: i32) -> ColumnSample {
        let (x, z) = (wx as f32 + 0.5, wz as f32 + 0.5);
        let s = self.cells.sample(x, z);
        let amp = self.height.cell_amplitude;

        // Both cells meeting at an edge see the same midpoint, so heights
        // stay continuous across the boundary.
        let mid = (s.value + s.neighbor_value) * 0.5;
        let t = smoothstep((s.edge_distance / self.height.edge_band).clamp(0.0, 1.0));
        let plateau = mid + (s.value - mid) * t;
        let detail = self.detail.get_noise_2d(x, z) * self.height.detail_amplitude;
        let height = (self.height.base + plateau * amp + detail).round() as i32;
        let height = height.clamp(1, self.max_surface());

        let step = (s.value - s.neighbor_value).abs() * amp;
        let kind = if s.edge_distance < self.terrain.cliff_edge_distance
            && step >= self.terrain.cliff_min_step
        {
            BlockKind::Cliff
        } else if s.value > self.terrain.grass_threshold {
            BlockKind::Grass
        } else {
            BlockKind::Dirt
        };

        ColumnSample {
            height,
            kind,
            cell: s.id,
            edge_distance: s.edge_distance,
        }
    }
}

#[inline]
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Inclusive voxel-y range a chunk's buffer must cover.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VerticalBounds {
    pub bottom: i32,
    pub top: i32,
}

impl VerticalBounds {
    #[inline]
    pub fn layers(&self) -> usize {
        (self.top - self.bottom + 1).max(0) as usize
    }

    #[inline]
    pub fn contains(&self, y: i32) -> bool {
        y >= self.bottom && y <= self.top
    }
}

/// Heights and kinds for a chunk's columns plus a `COLUMN_BORDER` ring.
///
/// Local column coordinates run over `[-COLUMN_BORDER, width + COLUMN_BORDER)`.
#[derive(Clone, Debug)]
pub struct TerrainColumns {
    pub coord: ChunkCoord,
    pub width: i32,
    heights: Vec<i32>,
    kinds: Vec<BlockKind>,
    pub bounds: VerticalBounds,
}

impl TerrainColumns {
    pub fn generate(field: &HeightField, coord: ChunkCoord, width: i32) -> Self {
        let span = width + 2 * COLUMN_BORDER;
        let origin = coord.origin(width);
        let samples: Vec<ColumnSample> = (0..span * span)
            .into_par_iter()
            .map(|i| {
                let lx = i % span - COLUMN_BORDER;
                let lz = i / span - COLUMN_BORDER;
                field.column(origin.x + lx, origin.z + lz)
            })
            .collect();
        let heights = samples.iter().map(|s| s.height).collect();
        let kinds = samples.iter().map(|s| s.kind).collect();
        Self::from_parts(coord, width, heights, kinds, field.height_limit())
    }

    /// Builds columns from explicit data laid out row-major over the bordered span.
    ///
    /// # Panics
    /// If `heights` or `kinds` does not hold `(width + 2 * COLUMN_BORDER)²` entries.
    pub fn from_parts(
        coord: ChunkCoord,
        width: i32,
        heights: Vec<i32>,
        kinds: Vec<BlockKind>,
        height_limit: i32,
    ) -> Self {
        let span = (width + 2 * COLUMN_BORDER) as usize;
        assert_eq!(heights.len(), span * span, "height span");
        assert_eq!(kinds.len(), span * span, "kind span");
        let mut out = Self {
            coord,
            width,
            heights,
            kinds,
            bounds: VerticalBounds { bottom: 0, top: 0 },
        };
        out.bounds = out.compute_bounds(height_limit);
        out
    }

    #[inline]
    fn slot(&self, lx: i32, lz: i32) -> usize {
        let span = self.width + 2 * COLUMN_BORDER;
        debug_assert!((-COLUMN_BORDER..self.width + COLUMN_BORDER).contains(&lx));
        debug_assert!((-COLUMN_BORDER..self.width + COLUMN_BORDER).contains(&lz));
        ((lz + COLUMN_BORDER) * span + (lx + COLUMN_BORDER)) as usize
    }

    #[inline]
    pub fn height(&self, lx: i32, lz: i32) -> i32 {
        self.heights[self.slot(lx, lz)]
    }

    #[inline]
    pub fn kind(&self, lx: i32, lz: i32) -> BlockKind {
        self.kinds[self.slot(lx, lz)]
    }

    /// Lowest voxel of the column that can border open space through a side
    /// or its top. Valid for `lx, lz` in `[-1, width + 1)`.
    pub fn floor(&self, lx: i32, lz: i32) -> i32 {
        let h = self.height(lx, lz);
        ChunkCoord::CARDINAL
            .iter()
            .map(|(dx, dz)| self.height(lx + dx, lz + dz) + 1)
            .fold(h, i32::min)
    }

    /// Floors of the chunk's own columns, row-major `(z * width + x)`.
    pub fn floors(&self) -> Vec<i32> {
        (0..self.width)
            .flat_map(|lz| (0..self.width).map(move |lx| (lx, lz)))
            .map(|(lx, lz)| self.floor(lx, lz))
            .collect()
    }

    pub fn max_height(&self) -> i32 {
        self.own_and_ring().map(|(lx, lz)| self.height(lx, lz)).max().unwrap_or(0)
    }

    fn own_and_ring(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (-1..self.width + 1).flat_map(move |lz| (-1..self.width + 1).map(move |lx| (lx, lz)))
    }

    // Covering the 1-ring keeps every cross-chunk lookup made by a voxel at
    // or above its floor inside the neighbor's buffer.
    fn compute_bounds(&self, height_limit: i32) -> VerticalBounds {
        let min_floor = self
            .own_and_ring()
            .map(|(lx, lz)| self.floor(lx, lz))
            .min()
            .unwrap_or(0);
        let bottom = (min_floor - 1).max(0);
        let top = (self.max_height() + 1).min(height_limit - 1).max(bottom);
        VerticalBounds { bottom, top }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(width: i32, h: i32) -> TerrainColumns {
        let span = (width + 2 * COLUMN_BORDER) as usize;
        TerrainColumns::from_parts(
            ChunkCoord::new(0, 0),
            width,
            vec![h; span * span],
            vec![BlockKind::Dirt; span * span],
            48,
        )
    }

    #[test]
    fn flat_bounds_hug_the_surface() {
        let cols = flat(4, 10);
        assert_eq!(cols.bounds, VerticalBounds { bottom: 9, top: 11 });
        assert_eq!(cols.floor(0, 0), 10);
        assert_eq!(cols.bounds.layers(), 3);
    }

    #[test]
    fn floor_drops_next_to_a_pit() {
        let width = 4;
        let span = width + 2 * COLUMN_BORDER;
        let mut heights = vec![10; (span * span) as usize];
        // Pit at local (1, 1).
        heights[((1 + COLUMN_BORDER) * span + 1 + COLUMN_BORDER) as usize] = 3;
        let cols = TerrainColumns::from_parts(
            ChunkCoord::new(0, 0),
            width,
            heights,
            vec![BlockKind::Dirt; (span * span) as usize],
            48,
        );
        assert_eq!(cols.floor(1, 1), 3);
        assert_eq!(cols.floor(2, 1), 4);
        assert_eq!(cols.floor(3, 3), 10);
        assert_eq!(cols.bounds.bottom, 2);
        assert_eq!(cols.bounds.top, 11);
    }

    #[test]
    fn top_respects_height_limit() {
        let span = (2 + 2 * COLUMN_BORDER) as usize;
        let cols = TerrainColumns::from_parts(
            ChunkCoord::new(0, 0),
            2,
            vec![30; span * span],
            vec![BlockKind::Grass; span * span],
            31,
        );
        assert_eq!(cols.bounds.top, 30);
    }
}
