use mosaic_blocks::{Block, BlockKind, Corner, Slope};
use mosaic_world::{TerrainColumns, VerticalBounds};
use rayon::prelude::*;

use crate::ChunkBuf;

/// Expands column heights into voxels. Layers are filled in parallel; each
/// voxel reads only the (immutable) column data.
pub fn synthesize_blocks(columns: &TerrainColumns) -> ChunkBuf {
    synthesize_blocks_from(columns, columns.bounds.bottom)
}

/// Like [`synthesize_blocks`], with the buffer reaching down to at least
/// `bottom` so carved overrides have room beneath them.
pub fn synthesize_blocks_from(columns: &TerrainColumns, bottom: i32) -> ChunkBuf {
    let width = columns.width.max(0) as usize;
    let bounds = VerticalBounds {
        bottom: bottom.min(columns.bounds.bottom),
        top: columns.bounds.top,
    };
    let mut buf = ChunkBuf::empty(columns.coord, width, bounds.bottom, bounds.layers());
    buf.floors = columns.floors();

    let layer_len = buf.layer_len();
    if layer_len == 0 {
        return buf;
    }
    buf.blocks
        .par_chunks_mut(layer_len)
        .enumerate()
        .for_each(|(ly, layer)| {
            let y = bounds.bottom + ly as i32;
            for z in 0..width {
                for x in 0..width {
                    let (lx, lz) = (x as i32, z as i32);
                    let h = columns.height(lx, lz);
                    if y > h {
                        continue;
                    }
                    let kind = columns.kind(lx, lz);
                    layer[z * width + x] = if y == h && kind == BlockKind::Cliff {
                        derive_slope(columns, lx, lz)
                    } else {
                        Block::solid(kind)
                    };
                }
            }
        });
    buf
}

/// Top voxel of a cliff column. A corner drops when either side touching it
/// borders a lower column; two or three dropped corners make a slope.
pub fn derive_slope(columns: &TerrainColumns, lx: i32, lz: i32) -> Block {
    let h = columns.height(lx, lz);
    let lower = |dx: i32, dz: i32| columns.height(lx + dx, lz + dz) < h;
    let (right, left, front, back) = (lower(1, 0), lower(-1, 0), lower(0, 1), lower(0, -1));

    let lowered: Vec<Corner> = Corner::ALL
        .into_iter()
        .filter(|c| match c {
            Corner::BackLeft => back || left,
            Corner::BackRight => back || right,
            Corner::FrontRight => front || right,
            Corner::FrontLeft => front || left,
        })
        .collect();

    let slope = match lowered.len() {
        2 => Slope::Nwse,
        3 => {
            let raised = Corner::ALL
                .into_iter()
                .find(|c| !lowered.contains(c))
                .unwrap_or(Corner::BackLeft);
            match raised {
                Corner::BackLeft | Corner::FrontRight => Slope::Swne,
                Corner::BackRight | Corner::FrontLeft => Slope::Nwse,
            }
        }
        _ => return Block::solid(BlockKind::Cliff),
    };
    Block::sloped(BlockKind::Cliff, slope, &lowered)
}
