//! Vertex emission from classified faces.

use mosaic_blocks::{Block, Corner, Palette, Rgba, Slope};
use mosaic_chunk::ChunkBuf;
use mosaic_geom::Vec3;

use crate::MeshError;
use crate::exposure::{Exposure, Faces, MeshCounts};
use crate::face::{CUBE, Direction, QUAD_TRIS};

/// Sloped top fan, six vertices: back-left, back-right, back-right,
/// front-right, front-left, front-left. Split along front-left/back-right.
const SWNE_CORNERS: [Corner; 6] = [
    Corner::BackLeft,
    Corner::BackRight,
    Corner::BackRight,
    Corner::FrontRight,
    Corner::FrontLeft,
    Corner::FrontLeft,
];
const SWNE_TRIS: [u32; 6] = [4, 1, 0, 5, 3, 2];

/// Back-left, back-left, back-right, front-right, front-right, front-left.
/// Split along back-left/front-right.
const NWSE_CORNERS: [Corner; 6] = [
    Corner::BackLeft,
    Corner::BackLeft,
    Corner::BackRight,
    Corner::FrontRight,
    Corner::FrontRight,
    Corner::FrontLeft,
];
const NWSE_TRIS: [u32; 6] = [3, 0, 5, 1, 4, 2];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub colors: Vec<Rgba>,
}

impl MeshBuffers {
    pub fn with_counts(counts: MeshCounts) -> Self {
        Self {
            positions: Vec::with_capacity(counts.vertices),
            normals: Vec::with_capacity(counts.vertices),
            indices: Vec::with_capacity(counts.indices),
            colors: Vec::with_capacity(counts.vertices),
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn push_vertex(&mut self, p: Vec3, rgba: Rgba) -> u32 {
        let i = self.positions.len() as u32;
        self.positions.push(p);
        self.colors.push(rgba);
        i
    }

    fn push_tris(&mut self, base: u32, tris: &[u32]) {
        self.indices.extend(tris.iter().map(|k| base + k));
    }

    /// Area-weighted per-vertex normals from the final triangles.
    /// Vertices no triangle references point up.
    pub fn recompute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let n = Vec3::triangle_normal(self.positions[a], self.positions[b], self.positions[c]);
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }
        self.normals = acc
            .into_iter()
            .map(|n| if n.length() > 0.0 { n.normalized() } else { Vec3::UP })
            .collect();
    }
}

/// Top corner position of a (possibly sloped) voxel.
#[inline]
fn corner_point(center: Vec3, block: &Block, c: Corner) -> Vec3 {
    let (dx, dz) = c.offset();
    center + Vec3::new(dx, 0.5 + block.corner(c), dz)
}

fn emit_quad(out: &mut MeshBuffers, center: Vec3, dir: Direction, rgba: Rgba) {
    let t = dir.template();
    let base = out.positions.len() as u32;
    for k in t {
        out.push_vertex(center + CUBE[k], rgba);
    }
    out.push_tris(base, &QUAD_TRIS);
}

/// Triangle of a side face whose top edge has one lowered corner. `HalfOut`
/// keeps the three unlowered template vertices; `HalfIn` fills the missing
/// triangle at full height, wound toward the voxel.
fn emit_half(out: &mut MeshBuffers, center: Vec3, block: &Block, dir: Direction, state: Exposure, rgba: Rgba) {
    let Some((c0, _)) = dir.edge_corners() else {
        return;
    };
    let first_lowered = block.corner(c0) < 0.0;
    let slots: [usize; 3] = match (state, first_lowered) {
        (Exposure::HalfOut, true) => [3, 2, 1],
        (Exposure::HalfOut, false) => [3, 2, 0],
        (_, true) => [0, 1, 3],
        (_, false) => [0, 1, 2],
    };
    let t = dir.template();
    let base = out.positions.len() as u32;
    for s in slots {
        out.push_vertex(center + CUBE[t[s]], rgba);
    }
    out.push_tris(base, &[0, 1, 2]);
}

fn fan_layout(slope: Slope) -> (&'static [Corner; 6], &'static [u32; 6]) {
    match slope {
        Slope::Swne => (&SWNE_CORNERS, &SWNE_TRIS),
        _ => (&NWSE_CORNERS, &NWSE_TRIS),
    }
}

fn emit_slope_top(out: &mut MeshBuffers, center: Vec3, block: &Block, rgba: Rgba) {
    let (corners, tris) = fan_layout(block.slope);
    let base = out.positions.len() as u32;
    for c in corners {
        out.push_vertex(corner_point(center, block, *c), rgba);
    }
    out.push_tris(base, tris);
}

/// The two duplicated fan corners, emitted alone when the top is covered.
fn emit_slope_apex(out: &mut MeshBuffers, center: Vec3, block: &Block, rgba: Rgba) {
    let (a, b) = match block.slope {
        Slope::Swne => (Corner::BackRight, Corner::FrontLeft),
        _ => (Corner::BackLeft, Corner::FrontRight),
    };
    out.push_vertex(corner_point(center, block, a), rgba);
    out.push_vertex(corner_point(center, block, b), rgba);
}

/// Emits geometry for every visible voxel in index order. Positions are
/// relative to the chunk anchor `(origin x, bottom, origin z)`.
pub fn assemble_mesh(
    buf: &ChunkBuf,
    faces: &[Faces],
    counts: MeshCounts,
    palette: &Palette,
) -> Result<MeshBuffers, MeshError> {
    let mut out = MeshBuffers::with_counts(counts);
    let w = buf.width;
    for (i, f) in faces.iter().enumerate() {
        if f.count == 0 {
            continue;
        }
        if out.positions.len() != f.vertex_offset as usize {
            return Err(MeshError::CursorMismatch {
                what: "vertices",
                emitted: out.positions.len(),
                expected: f.vertex_offset as usize,
            });
        }
        if out.indices.len() != f.index_offset as usize {
            return Err(MeshError::CursorMismatch {
                what: "indices",
                emitted: out.indices.len(),
                expected: f.index_offset as usize,
            });
        }
        let block = buf.blocks[i];
        let (x, z, ly) = (i % w, (i / w) % w, i / (w * w));
        let center = Vec3::new(x as f32 + 0.5, ly as f32 + 0.5, z as f32 + 0.5);
        let rgba = palette.color(block.kind);

        for (dir, state) in f.exposure.iter() {
            match state {
                Exposure::Hidden => {}
                Exposure::Full if dir == Direction::PosY && f.sloped => {
                    emit_slope_top(&mut out, center, &block, rgba)
                }
                Exposure::Full => emit_quad(&mut out, center, dir, rgba),
                Exposure::HalfOut | Exposure::HalfIn => {
                    emit_half(&mut out, center, &block, dir, state, rgba)
                }
            }
        }
        if f.sloped && !f.exposure[Direction::PosY].is_visible() {
            emit_slope_apex(&mut out, center, &block, rgba);
        }
    }
    if out.positions.len() != counts.vertices {
        return Err(MeshError::CursorMismatch {
            what: "vertices",
            emitted: out.positions.len(),
            expected: counts.vertices,
        });
    }
    if out.indices.len() != counts.indices {
        return Err(MeshError::CursorMismatch {
            what: "indices",
            emitted: out.indices.len(),
            expected: counts.indices,
        });
    }
    out.recompute_normals();
    Ok(out)
}
