//! Per-voxel face classification and buffer offsets.

use mosaic_blocks::Block;
use mosaic_chunk::ChunkBuf;
use rayon::prelude::*;

use crate::MeshError;
use crate::face::{Direction, PerFace};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Exposure {
    #[default]
    Hidden,
    Full,
    /// Side of a sloped voxel with one lowered corner, facing open space.
    HalfOut,
    /// Triangle above a sloped voxel's lowered edge, covering an unsloped neighbor's wall.
    HalfIn,
}

impl Exposure {
    #[inline]
    pub fn is_visible(self) -> bool {
        self != Exposure::Hidden
    }

    #[inline]
    pub fn vertex_count(self) -> u32 {
        match self {
            Exposure::Hidden => 0,
            Exposure::Full => 4,
            Exposure::HalfOut | Exposure::HalfIn => 3,
        }
    }

    #[inline]
    pub fn index_count(self) -> u32 {
        match self {
            Exposure::Hidden => 0,
            Exposure::Full => 6,
            Exposure::HalfOut | Exposure::HalfIn => 3,
        }
    }
}

/// Extra vertices carried by a visible sloped voxel (its shared apex pair).
pub const SLOPE_APEX_VERTICES: u32 = 2;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Faces {
    pub exposure: PerFace<Exposure>,
    /// Number of visible faces.
    pub count: u8,
    pub sloped: bool,
    pub vertex_offset: u32,
    pub index_offset: u32,
}

impl Faces {
    pub fn vertex_count(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        let faces: u32 = self.exposure.0.iter().map(|e| e.vertex_count()).sum();
        faces + if self.sloped { SLOPE_APEX_VERTICES } else { 0 }
    }

    pub fn index_count(&self) -> u32 {
        self.exposure.0.iter().map(|e| e.index_count()).sum()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshCounts {
    pub vertices: usize,
    pub indices: usize,
    /// Voxels with at least one visible face.
    pub voxels: usize,
}

/// Classifies every voxel of `center`. `sides` are the adjacent chunks in
/// `Direction::SIDES` order; they must have completed block synthesis.
pub fn classify_faces(center: &ChunkBuf, sides: [&ChunkBuf; 4]) -> Result<Vec<Faces>, MeshError> {
    for side in sides {
        if side.width != center.width {
            return Err(MeshError::WidthMismatch {
                neighbor: side.coord,
                expected: center.width,
                got: side.width,
            });
        }
    }
    (0..center.blocks.len())
        .into_par_iter()
        .map(|i| classify_voxel(center, &sides, i))
        .collect()
}

fn classify_voxel(center: &ChunkBuf, sides: &[&ChunkBuf; 4], i: usize) -> Result<Faces, MeshError> {
    let block = center.blocks[i];
    if !block.is_solid() {
        return Ok(Faces::default());
    }
    let w = center.width;
    let x = i % w;
    let z = (i / w) % w;
    let ly = i / (w * w);
    let y = center.bottom + ly as i32;
    if y < center.floor(x, z) {
        return Ok(Faces::default());
    }

    let mut faces = Faces {
        sloped: block.is_sloped(),
        ..Faces::default()
    };
    for dir in Direction::ALL {
        let neighbor = neighbor_block(center, sides, dir, x, ly, z)?;
        let state = if dir.is_horizontal() && block.is_sloped() {
            sloped_side(&block, dir, &neighbor)
        } else if neighbor.is_translucent() {
            Exposure::Full
        } else {
            Exposure::Hidden
        };
        faces.exposure[dir] = state;
        if state.is_visible() {
            faces.count += 1;
        }
    }
    Ok(faces)
}

/// Side face of a sloped voxel. The two top corners on that side decide:
/// both lowered leaves no area, one lowered leaves a triangle.
fn sloped_side(block: &Block, dir: Direction, neighbor: &Block) -> Exposure {
    let Some((a, b)) = dir.edge_corners() else {
        return Exposure::Hidden;
    };
    match (-block.edge_sum(a, b)).round() as i32 {
        n if n >= 2 => Exposure::Hidden,
        1 => {
            if neighbor.is_translucent() {
                Exposure::HalfOut
            } else if !neighbor.is_sloped() {
                Exposure::HalfIn
            } else {
                Exposure::Hidden
            }
        }
        _ => {
            if neighbor.is_translucent() {
                Exposure::Full
            } else {
                Exposure::Hidden
            }
        }
    }
}

/// Voxel across face `dir`. Vertical steps beyond the buffer read as air;
/// voxels at or over their floor never step below it, since floors sit above
/// the bottom layer;
/// horizontal steps beyond the chunk read the side neighbor after rebasing
/// world `y` onto that neighbor's own vertical bounds.
fn neighbor_block(
    center: &ChunkBuf,
    sides: &[&ChunkBuf; 4],
    dir: Direction,
    x: usize,
    ly: usize,
    z: usize,
) -> Result<Block, MeshError> {
    let w = center.width as i32;
    let (dx, dy, dz) = dir.delta();
    if dy != 0 {
        let ny = ly as i32 + dy;
        if ny < 0 || ny as usize >= center.layers {
            return Ok(Block::AIR);
        }
        return Ok(center.get_local(x, ny as usize, z));
    }

    let nx = x as i32 + dx;
    let nz = z as i32 + dz;
    if (0..w).contains(&nx) && (0..w).contains(&nz) {
        return Ok(center.get_local(nx as usize, ly, nz as usize));
    }

    let side = sides[dir.index()];
    let y = center.bottom + ly as i32;
    let layer = y - side.bottom;
    if layer < 0 || layer as usize >= side.layers {
        return Err(MeshError::AdjacentIndexOutOfRange {
            dir,
            x,
            y,
            z,
            neighbor: side.coord,
            layer,
            layers: side.layers,
        });
    }
    Ok(side.get_local(nx.rem_euclid(w) as usize, layer as usize, nz.rem_euclid(w) as usize))
}

/// Assigns buffer offsets in increasing voxel order. Must run after every
/// voxel is classified; this pass is inherently sequential.
pub fn prefix_offsets(faces: &mut [Faces]) -> MeshCounts {
    let mut vertices: u32 = 0;
    let mut indices: u32 = 0;
    let mut voxels = 0;
    for f in faces.iter_mut() {
        f.vertex_offset = vertices;
        f.index_offset = indices;
        if f.count > 0 {
            vertices += f.vertex_count();
            indices += f.index_count();
            voxels += 1;
        }
    }
    MeshCounts {
        vertices: vertices as usize,
        indices: indices as usize,
        voxels,
    }
}

/// Classification followed by the prefix pass.
pub fn compute_faces(
    center: &ChunkBuf,
    sides: [&ChunkBuf; 4],
) -> Result<(Vec<Faces>, MeshCounts), MeshError> {
    let mut faces = classify_faces(center, sides)?;
    let counts = prefix_offsets(&mut faces);
    Ok((faces, counts))
}
