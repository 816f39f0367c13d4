use mosaic_blocks::{Block, BlockError};
use mosaic_world::{ChunkCoord, TerrainColumns};

use crate::ChunkBuf;

/// A persisted voxel change: local column `(x, z)`, world `y`, raw kind id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockOverride {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub id: u8,
}

/// Applies persisted changes on top of synthesized blocks.
///
/// All ids are decoded before anything is written, so an unknown id leaves
/// the buffer untouched. Skipped with a debug log: positions outside the
/// buffer, solid voxels above the column surface (where neighbor buffers are
/// not guaranteed to reach), and carves whose opened floor would land on the
/// buffer's bottom layer. Synthesize with [`carve_bottom`] to make room for
/// every carve. Returns how many overrides were applied.
pub fn apply_overrides(
    buf: &mut ChunkBuf,
    columns: &TerrainColumns,
    overrides: &[BlockOverride],
) -> Result<usize, BlockError> {
    let decoded = overrides
        .iter()
        .map(|o| Block::from_raw(o.id).map(|b| (*o, b)))
        .collect::<Result<Vec<_>, _>>()?;

    let width = buf.width as i32;
    let mut applied = 0;
    for (o, block) in decoded {
        if o.x < 0 || o.x >= width || o.z < 0 || o.z >= width {
            log::debug!(target: "blocks", "override outside chunk {} at ({}, {}, {})", buf.coord, o.x, o.y, o.z);
            continue;
        }
        let Some(ly) = buf.local_y(o.y) else {
            log::debug!(target: "blocks", "override outside bounds {} at y={}", buf.coord, o.y);
            continue;
        };
        if block.is_solid() && o.y > columns.height(o.x, o.z) {
            log::debug!(target: "blocks", "override above surface {} at ({}, {}, {})", buf.coord, o.x, o.y, o.z);
            continue;
        }
        if !block.is_solid() && ly < CARVE_HEADROOM {
            log::debug!(target: "blocks", "carve too deep for {} at ({}, {}, {})", buf.coord, o.x, o.y, o.z);
            continue;
        }
        buf.set_local(o.x as usize, ly, o.z as usize, block);
        if !block.is_solid() {
            open_floors(buf, o.x, o.y, o.z);
        }
        applied += 1;
    }
    Ok(applied)
}

/// Layers a carve must keep below it: the voxel it uncovers, plus the
/// enclosed layer that voxel rests on.
const CARVE_HEADROOM: usize = 2;

fn carves(overrides: &[BlockOverride], width: i32) -> impl Iterator<Item = &BlockOverride> {
    overrides.iter().filter(move |o| {
        (0..width).contains(&o.x)
            && (0..width).contains(&o.z)
            && Block::from_raw(o.id).is_ok_and(|b| !b.is_solid())
    })
}

/// Lowest buffer bottom that leaves room under every carve in `overrides`.
///
/// A chunk's buffer must cover the carves of its own overrides and of all
/// eight neighbors: walls and floors opened next to a carve look sideways
/// into the adjacent chunks at the carve's depth. Unknown ids are ignored
/// here; [`apply_overrides`] reports them for the chunk that owns them.
pub fn carve_bottom(overrides: &[BlockOverride], width: i32) -> Option<i32> {
    carves(overrides, width)
        .map(|o| o.y - CARVE_HEADROOM as i32)
        .min()
}

/// Reopens this chunk's walls beside carves made in the side neighbor at
/// chunk offset `offset`. Returns how many column floors dropped.
pub fn open_border_walls(buf: &mut ChunkBuf, offset: (i32, i32), overrides: &[BlockOverride]) -> usize {
    let width = buf.width as i32;
    let mut opened = 0;
    for o in carves(overrides, width) {
        let (x, z) = (o.x + offset.0 * width, o.z + offset.1 * width);
        for (dx, dz) in ChunkCoord::CARDINAL {
            if lower_floor(buf, x + dx, z + dz, o.y) {
                opened += 1;
            }
        }
    }
    opened
}

/// A carve at `y` uncovers the voxel below it and the walls beside it.
fn open_floors(buf: &mut ChunkBuf, x: i32, y: i32, z: i32) {
    lower_floor(buf, x, z, y - 1);
    for (dx, dz) in ChunkCoord::CARDINAL {
        lower_floor(buf, x + dx, z + dz, y);
    }
}

/// Floors stay above the bottom layer, so every voxel at or over its floor
/// finds the voxel below it inside the buffer.
fn lower_floor(buf: &mut ChunkBuf, x: i32, z: i32, to: i32) -> bool {
    let width = buf.width as i32;
    if x < 0 || x >= width || z < 0 || z >= width || to <= buf.bottom {
        return false;
    }
    let slot = z as usize * buf.width + x as usize;
    if to >= buf.floors[slot] {
        return false;
    }
    buf.floors[slot] = to;
    true
}
