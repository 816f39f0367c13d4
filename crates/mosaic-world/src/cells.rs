//! Jittered-lattice cellular noise.
//!
//! The plane is divided into unit lattice squares (scaled by `1 / frequency`);
//! each square owns one feature point jittered around its center, and the
//! square's integer index is the cell id. Sampling finds the two nearest
//! feature points of a domain-warped coordinate. Everything is a pure function
//! of the parameters and the coordinate, so any chunk on any thread recomputes
//! the same answer.

use std::fmt;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use mosaic_grid::{GridKey, GridPos};

use crate::config::CellParams;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub x: i32,
    pub z: i32,
}

impl CellId {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell({}, {})", self.x, self.z)
    }
}

/// Cell ids index a width-1 grid directly.
impl GridKey for CellId {
    #[inline]
    fn grid_pos(self, _cell_width: i32) -> GridPos {
        GridPos::new(self.x, self.z)
    }
}

/// Continuous horizontal point in world units.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct CellPoint {
    pub x: f32,
    pub z: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellSample {
    pub id: CellId,
    /// Per-cell scalar in `[0, 1)`.
    pub value: f32,
    /// Representative (feature) point in world units.
    pub position: CellPoint,
    /// Distance in world units from the warped coordinate to the edge shared
    /// with `neighbor`; zero on the edge and growing toward the cell interior.
    pub edge_distance: f32,
    /// Runner-up cell: the one across the nearest edge.
    pub neighbor: CellId,
    pub neighbor_value: f32,
}

/// Identity and fixed attributes of a cell, independent of where it was sampled.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellInfo {
    pub id: CellId,
    pub value: f32,
    pub position: CellPoint,
}

impl CellSample {
    #[inline]
    pub fn cell(&self) -> CellInfo {
        CellInfo {
            id: self.id,
            value: self.value,
            position: self.position,
        }
    }
}

const SALT_JITTER_X: u32 = 0x68E3_1DA4;
const SALT_JITTER_Z: u32 = 0xB529_7A4D;
const SALT_VALUE: u32 = 0x1B56_C4E9;

/// Lattice squares searched in each direction around the sample's own square.
const SEARCH: i32 = 2;

pub struct CellNoiseField {
    seed: i32,
    frequency: f32,
    jitter: f32,
    smoothing: f32,
    warp_x: FastNoiseLite,
    warp_z: FastNoiseLite,
}

impl CellNoiseField {
    pub fn new(params: &CellParams) -> Self {
        let mut warp_x = FastNoiseLite::with_seed(params.seed ^ 0x2C1B_3C6D);
        warp_x.set_noise_type(Some(NoiseType::OpenSimplex2));
        warp_x.set_frequency(Some(params.frequency * 2.0));
        let mut warp_z = FastNoiseLite::with_seed(params.seed ^ 0x297A_2D39);
        warp_z.set_noise_type(Some(NoiseType::OpenSimplex2));
        warp_z.set_frequency(Some(params.frequency * 2.0));
        Self {
            seed: params.seed,
            frequency: params.frequency,
            jitter: params.jitter.clamp(0.0, 1.0),
            smoothing: params.edge_smoothing.max(0.0),
            warp_x,
            warp_z,
        }
    }

    /// Scalar value attached to a cell, in `[0, 1)`.
    #[inline]
    pub fn cell_value(&self, id: CellId) -> f32 {
        hash01(self.seed, id.x, id.z, SALT_VALUE)
    }

    /// Feature point of `id` in lattice units.
    fn feature_lattice(&self, id: CellId) -> (f32, f32) {
        let jx = (hash01(self.seed, id.x, id.z, SALT_JITTER_X) * 2.0 - 1.0) * 0.5 * self.jitter;
        let jz = (hash01(self.seed, id.x, id.z, SALT_JITTER_Z) * 2.0 - 1.0) * 0.5 * self.jitter;
        (id.x as f32 + 0.5 + jx, id.z as f32 + 0.5 + jz)
    }

    /// Feature point of `id` in world units.
    pub fn cell_position(&self, id: CellId) -> CellPoint {
        let (lx, lz) = self.feature_lattice(id);
        CellPoint {
            x: lx / self.frequency,
            z: lz / self.frequency,
        }
    }

    pub fn cell_info(&self, id: CellId) -> CellInfo {
        CellInfo {
            id,
            value: self.cell_value(id),
            position: self.cell_position(id),
        }
    }

    /// Cells whose feature point lies in the world rectangle
    /// `[x0, x1) x [z0, z1)`. Feature points never leave their lattice square,
    /// so only the squares overlapping the rectangle are checked.
    pub fn feature_points_in(&self, x0: f32, z0: f32, x1: f32, z1: f32) -> Vec<CellInfo> {
        let (ix0, ix1) = ((x0 * self.frequency).floor() as i32, (x1 * self.frequency).floor() as i32);
        let (iz0, iz1) = ((z0 * self.frequency).floor() as i32, (z1 * self.frequency).floor() as i32);
        let mut out = Vec::new();
        for iz in iz0..=iz1 {
            for ix in ix0..=ix1 {
                let info = self.cell_info(CellId::new(ix, iz));
                let p = info.position;
                if p.x >= x0 && p.x < x1 && p.z >= z0 && p.z < z1 {
                    out.push(info);
                }
            }
        }
        out
    }

    fn warp(&self, x: f32, z: f32) -> (f32, f32) {
        if self.smoothing == 0.0 {
            return (x, z);
        }
        (
            x + self.warp_x.get_noise_2d(x, z) * self.smoothing,
            z + self.warp_z.get_noise_2d(x, z) * self.smoothing,
        )
    }

    pub fn sample(&self, x: f32, z: f32) -> CellSample {
        let (wx, wz) = self.warp(x, z);
        let lx = wx * self.frequency;
        let lz = wz * self.frequency;
        let ix = lx.floor() as i32;
        let iz = lz.floor() as i32;

        // (distance², id, feature point); ties resolve to the smaller id so
        // the result does not depend on search order.
        let mut best: Option<(f32, CellId, (f32, f32))> = None;
        let mut second: Option<(f32, CellId, (f32, f32))> = None;
        for dz in -SEARCH..=SEARCH {
            for dx in -SEARCH..=SEARCH {
                let id = CellId::new(ix + dx, iz + dz);
                let p = self.feature_lattice(id);
                let d2 = (p.0 - lx) * (p.0 - lx) + (p.1 - lz) * (p.1 - lz);
                let cand = (d2, id, p);
                if closer(&cand, best.as_ref()) {
                    second = best;
                    best = Some(cand);
                } else if closer(&cand, second.as_ref()) {
                    second = Some(cand);
                }
            }
        }
        // The search window always holds 25 candidates.
        let (d1, id, p1) = best.unwrap_or((0.0, CellId::new(ix, iz), (lx, lz)));
        let (d2, neighbor, p2) = second.unwrap_or((d1, id, p1));

        let sep = ((p2.0 - p1.0).powi(2) + (p2.1 - p1.1).powi(2)).sqrt();
        let edge_lattice = if sep > 0.0 {
            ((d2 - d1) / (2.0 * sep)).max(0.0)
        } else {
            0.0
        };

        CellSample {
            id,
            value: self.cell_value(id),
            position: CellPoint {
                x: p1.0 / self.frequency,
                z: p1.1 / self.frequency,
            },
            edge_distance: edge_lattice / self.frequency,
            neighbor,
            neighbor_value: self.cell_value(neighbor),
        }
    }
}

#[inline]
fn closer(cand: &(f32, CellId, (f32, f32)), cur: Option<&(f32, CellId, (f32, f32))>) -> bool {
    match cur {
        None => true,
        Some(c) => cand.0 < c.0 || (cand.0 == c.0 && cand.1 < c.1),
    }
}

#[inline]
fn hash2(seed: i32, x: i32, z: i32, salt: u32) -> u32 {
    let mut h = (seed as u32) ^ salt;
    h ^= (x as u32).wrapping_mul(0x9E37_79B1);
    h = h.rotate_left(13).wrapping_mul(0x85EB_CA77);
    h ^= (z as u32).wrapping_mul(0xC2B2_AE3D);
    h = h.rotate_left(17).wrapping_mul(0x27D4_EB2F);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^ (h >> 16)
}

#[inline]
fn hash01(seed: i32, x: i32, z: i32, salt: u32) -> f32 {
    (hash2(seed, x, z, salt) >> 8) as f32 / (1u32 << 24) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CellParams {
        CellParams {
            seed: 5678,
            frequency: 0.02,
            edge_smoothing: 0.0,
            jitter: 0.15,
        }
    }

    #[test]
    fn values_stay_in_unit_range() {
        let field = CellNoiseField::new(&params());
        for x in -20..20 {
            for z in -20..20 {
                let v = field.cell_value(CellId::new(x, z));
                assert!((0.0..1.0).contains(&v));
            }
        }
    }

    #[test]
    fn unwarped_sample_inside_feature_square_owns_it() {
        let field = CellNoiseField::new(&params());
        let id = CellId::new(3, -2);
        let p = field.cell_position(id);
        let s = field.sample(p.x, p.z);
        assert_eq!(s.id, id);
        assert!(s.edge_distance > 0.0);
        assert_ne!(s.neighbor, id);
    }

    #[test]
    fn edge_distance_shrinks_toward_boundary() {
        let field = CellNoiseField::new(&CellParams {
            jitter: 0.0,
            ..params()
        });
        let a = field.cell_position(CellId::new(0, 0));
        let b = field.cell_position(CellId::new(1, 0));
        // Walk from a's feature point toward b's while still inside a.
        let mut last = f32::INFINITY;
        for i in 0..20 {
            let t = i as f32 / 40.0;
            let s = field.sample(a.x + (b.x - a.x) * t, a.z + (b.z - a.z) * t);
            if s.id != CellId::new(0, 0) {
                break;
            }
            assert!(s.edge_distance <= last + 1e-3);
            last = s.edge_distance;
        }
    }

    #[test]
    fn feature_points_partition_the_plane() {
        let field = CellNoiseField::new(&params());
        let whole = field.feature_points_in(-120.0, -120.0, 120.0, 120.0);
        let mut halves = field.feature_points_in(-120.0, -120.0, 0.0, 120.0);
        halves.extend(field.feature_points_in(0.0, -120.0, 120.0, 120.0));
        assert_eq!(whole.len(), halves.len());
        // Squares are 50 wide at this frequency: -2..=1 on each axis.
        assert_eq!(whole.len(), 16);
        for info in &whole {
            assert!(info.position.x >= -120.0 && info.position.x < 120.0);
        }
    }
}
