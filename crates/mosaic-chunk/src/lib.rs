//! Dense per-chunk voxel buffers and block synthesis.
#![forbid(unsafe_code)]

mod overrides;
mod synth;

use mosaic_blocks::Block;
use mosaic_world::ChunkCoord;

pub use overrides::{BlockOverride, apply_overrides, carve_bottom, open_border_walls};
pub use synth::{derive_slope, synthesize_blocks, synthesize_blocks_from};

/// Voxels of one chunk between its vertical bounds.
///
/// Local layer `ly` holds world `y = bottom + ly`; storage index is
/// `(ly * width + z) * width + x`, so each layer is one contiguous slice.
#[derive(Clone, Debug)]
pub struct ChunkBuf {
    pub coord: ChunkCoord,
    pub width: usize,
    pub bottom: i32,
    pub layers: usize,
    pub blocks: Vec<Block>,
    /// World y of the lowest voxel per column (`z * width + x`) that can
    /// touch open space; anything below is enclosed by terrain. Synthesized
    /// and carved floors always sit above the bottom layer.
    pub floors: Vec<i32>,
}

impl ChunkBuf {
    /// Buffer filled with `block`; no column floors, so nothing is presumed enclosed.
    pub fn filled(coord: ChunkCoord, width: usize, bottom: i32, layers: usize, block: Block) -> Self {
        Self {
            coord,
            width,
            bottom,
            layers,
            blocks: vec![block; width * width * layers],
            floors: vec![bottom; width * width],
        }
    }

    pub fn empty(coord: ChunkCoord, width: usize, bottom: i32, layers: usize) -> Self {
        Self::filled(coord, width, bottom, layers, Block::AIR)
    }

    #[inline]
    pub fn idx(&self, x: usize, ly: usize, z: usize) -> usize {
        (ly * self.width + z) * self.width + x
    }

    #[inline]
    pub fn layer_len(&self) -> usize {
        self.width * self.width
    }

    #[inline]
    pub fn get_local(&self, x: usize, ly: usize, z: usize) -> Block {
        self.blocks[self.idx(x, ly, z)]
    }

    #[inline]
    pub fn set_local(&mut self, x: usize, ly: usize, z: usize, b: Block) {
        let i = self.idx(x, ly, z);
        self.blocks[i] = b;
    }

    /// Highest world y held by the buffer.
    #[inline]
    pub fn top(&self) -> i32 {
        self.bottom + self.layers as i32 - 1
    }

    /// Local layer of world `y`, if the buffer covers it.
    #[inline]
    pub fn local_y(&self, y: i32) -> Option<usize> {
        let ly = y - self.bottom;
        (ly >= 0 && (ly as usize) < self.layers).then_some(ly as usize)
    }

    /// Block at local column `(x, z)` and world `y`.
    #[inline]
    pub fn get_world_y(&self, x: usize, y: i32, z: usize) -> Option<Block> {
        self.local_y(y).map(|ly| self.get_local(x, ly, z))
    }

    #[inline]
    pub fn floor(&self, x: usize, z: usize) -> i32 {
        self.floors[z * self.width + x]
    }

    pub fn solid_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_solid()).count()
    }
}
