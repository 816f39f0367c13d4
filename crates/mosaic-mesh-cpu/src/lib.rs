//! CPU meshing: face visibility across chunk borders and mesh assembly,
//! including sloped tops and half-exposed sides.
#![forbid(unsafe_code)]

pub mod emit;
pub mod exposure;
pub mod face;

use std::time::Instant;

use mosaic_blocks::{MaterialId, Palette};
use mosaic_chunk::ChunkBuf;
use mosaic_geom::{Aabb, Vec3};
use mosaic_world::ChunkCoord;
use thiserror::Error;

pub use emit::{MeshBuffers, assemble_mesh};
pub use exposure::{
    Exposure, Faces, MeshCounts, SLOPE_APEX_VERTICES, classify_faces, compute_faces,
    prefix_offsets,
};
pub use face::{CUBE, Direction, PerFace, QUAD_TRIS};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error(
        "{dir:?} lookup from voxel ({x}, {y}, {z}) lands on layer {layer} of neighbor {neighbor}, which holds {layers}"
    )]
    AdjacentIndexOutOfRange {
        dir: Direction,
        x: usize,
        y: i32,
        z: usize,
        neighbor: ChunkCoord,
        layer: i32,
        layers: usize,
    },
    #[error("neighbor {neighbor} is {got} wide, expected {expected}")]
    WidthMismatch {
        neighbor: ChunkCoord,
        expected: usize,
        got: usize,
    },
    #[error("emitted {emitted} {what}, offsets reserve {expected}")]
    CursorMismatch {
        what: &'static str,
        emitted: usize,
        expected: usize,
    },
}

/// Finished geometry for one chunk, ready for the renderer.
#[derive(Clone, Debug)]
pub struct ChunkMesh {
    pub coord: ChunkCoord,
    /// World position that mesh-local positions are relative to.
    pub anchor: Vec3,
    pub material: MaterialId,
    pub buffers: MeshBuffers,
    pub counts: MeshCounts,
    /// Local-space bounds; `None` for an empty mesh.
    pub bounds: Option<Aabb>,
}

impl ChunkMesh {
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.bounds.map(|b| b.translated(self.anchor))
    }
}

/// Face visibility plus assembly for `center`, given its four side
/// neighbors in `Direction::SIDES` order.
pub fn build_chunk_mesh(
    center: &ChunkBuf,
    sides: [&ChunkBuf; 4],
    palette: &Palette,
) -> Result<ChunkMesh, MeshError> {
    let t0 = Instant::now();
    let (faces, counts) = compute_faces(center, sides)?;
    let t_faces = t0.elapsed().as_millis();
    let buffers = assemble_mesh(center, &faces, counts, palette)?;
    let bounds = Aabb::from_points(buffers.positions.iter().copied());
    let width = center.width as i32;
    let origin = center.coord.origin(width);
    log::debug!(
        target: "perf",
        "ms={} mesh_build faces_ms={} verts={} tris={} cx={} cz={}",
        t0.elapsed().as_millis(),
        t_faces,
        buffers.vertex_count(),
        buffers.triangle_count(),
        center.coord.cx,
        center.coord.cz
    );
    Ok(ChunkMesh {
        coord: center.coord,
        anchor: Vec3::new(origin.x as f32, center.bottom as f32, origin.z as f32),
        material: MaterialId::TERRAIN,
        buffers,
        counts,
        bounds,
    })
}
