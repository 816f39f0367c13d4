//! Per-chunk stage machine and level-of-detail zones.

use std::sync::Arc;

use mosaic_chunk::ChunkBuf;
use mosaic_mesh_cpu::MeshCounts;
use mosaic_world::{CellId, ChunkCoord, TerrainColumns};

/// Generation stages in strict forward order. A chunk's stage is the last
/// one it completed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Create = 0,
    Cell = 1,
    Poi = 2,
    Height = 3,
    Blocks = 4,
    Mesh = 5,
}

impl Stage {
    pub const COUNT: usize = 6;

    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Create,
        Stage::Cell,
        Stage::Poi,
        Stage::Height,
        Stage::Blocks,
        Stage::Mesh,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn next(self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Create => "create",
            Stage::Cell => "cell",
            Stage::Poi => "poi",
            Stage::Height => "height",
            Stage::Blocks => "blocks",
            Stage::Mesh => "mesh",
        }
    }
}

/// Ring-distance tier around the view chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum LodZone {
    /// Close enough that nothing is withheld: full mesh.
    None,
    Inner,
    Outer,
    Edge,
    /// Past the view ring; only cell data and POIs are kept.
    #[default]
    Dormant,
}

impl LodZone {
    /// Zone of a chunk at ring distance `ring` for a view radius `radius`.
    pub fn for_ring(ring: i32, radius: i32) -> LodZone {
        match radius - ring {
            d if d < 0 => LodZone::Dormant,
            0 => LodZone::Edge,
            1 => LodZone::Outer,
            2 => LodZone::Inner,
            _ => LodZone::None,
        }
    }

    /// Highest stage a chunk in this zone may hold.
    pub fn stage_cap(self) -> Stage {
        match self {
            LodZone::None => Stage::Mesh,
            LodZone::Inner => Stage::Blocks,
            LodZone::Outer => Stage::Height,
            LodZone::Edge | LodZone::Dormant => Stage::Poi,
        }
    }
}

/// Which cells a chunk's columns belong to, from a full column scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellCover {
    /// Cell owning the most columns; ties go to the smaller id.
    pub owner: CellId,
    /// Every cell with at least one column, sorted.
    pub cells: Vec<CellId>,
}

impl CellCover {
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.cells.len() > 1
    }
}

/// A cell whose feature point falls inside this chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Poi {
    pub cell: CellId,
    /// Local column `(x, z)` of the feature point.
    pub column: (i32, i32),
}

#[derive(Clone, Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub stage: Stage,
    pub zone: LodZone,
    /// Distinct cells seen at the corners and center during discovery, sorted.
    pub cells: Vec<CellId>,
    pub cover: Option<CellCover>,
    pub pois: Vec<Poi>,
    pub columns: Option<Arc<TerrainColumns>>,
    pub blocks: Option<Arc<ChunkBuf>>,
    /// Counts of the last mesh handed out; `Some` while the renderer holds it.
    pub mesh: Option<MeshCounts>,
    /// Set when a pass failed; the chunk is skipped until re-flagged.
    pub faulted: bool,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, cells: Vec<CellId>) -> Self {
        Self {
            coord,
            stage: Stage::Create,
            zone: LodZone::Dormant,
            cells,
            cover: None,
            pois: Vec::new(),
            columns: None,
            blocks: None,
            mesh: None,
            faulted: false,
        }
    }

    /// True when a chunk sits on more than one cell.
    pub fn is_boundary(&self) -> bool {
        match &self.cover {
            Some(cover) => cover.is_boundary(),
            None => self.cells.len() > 1,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.zone != LodZone::Dormant
    }

    /// The stage this chunk would run next, if its zone allows it.
    pub fn pending_stage(&self) -> Option<Stage> {
        if self.faulted {
            return None;
        }
        self.stage.next().filter(|s| *s <= self.zone.stage_cap())
    }

    /// Drops everything above `cap`. Returns true if a mesh was released.
    pub fn demote(&mut self, cap: Stage) -> bool {
        if self.stage <= cap {
            return false;
        }
        self.stage = cap;
        if cap < Stage::Height {
            self.columns = None;
        }
        if cap < Stage::Blocks {
            self.blocks = None;
        }
        if cap < Stage::Mesh {
            return self.mesh.take().is_some();
        }
        false
    }

    /// Clears a fault and sends a meshed chunk back for remeshing.
    /// Returns true if a mesh was released.
    pub fn reflag(&mut self) -> bool {
        self.faulted = false;
        self.demote(Stage::Blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zones_follow_ring_distance() {
        let v = 8;
        assert_eq!(LodZone::for_ring(0, v), LodZone::None);
        assert_eq!(LodZone::for_ring(5, v), LodZone::None);
        assert_eq!(LodZone::for_ring(6, v), LodZone::Inner);
        assert_eq!(LodZone::for_ring(7, v), LodZone::Outer);
        assert_eq!(LodZone::for_ring(8, v), LodZone::Edge);
        assert_eq!(LodZone::for_ring(9, v), LodZone::Dormant);
    }

    #[test]
    fn caps_leave_room_for_mesh_neighbors() {
        // A meshed chunk's cardinal neighbors sit at most one ring further
        // out, and that ring still reaches BLOCKS.
        let v = 5;
        for ring in 0..=v {
            if LodZone::for_ring(ring, v).stage_cap() == Stage::Mesh {
                assert!(LodZone::for_ring(ring + 1, v).stage_cap() >= Stage::Blocks);
            }
        }
    }

    #[test]
    fn stages_advance_in_order() {
        let mut s = Stage::Create;
        let mut seen = vec![s];
        while let Some(n) = s.next() {
            assert!(n > s);
            seen.push(n);
            s = n;
        }
        assert_eq!(seen, Stage::ALL.to_vec());
    }

    #[test]
    fn demotion_drops_buffers_above_the_cap() {
        let mut c = Chunk::new(ChunkCoord::new(0, 0), vec![CellId::new(0, 0)]);
        c.stage = Stage::Mesh;
        c.mesh = Some(MeshCounts::default());
        assert!(c.demote(Stage::Poi));
        assert_eq!(c.stage, Stage::Poi);
        assert!(c.mesh.is_none() && c.blocks.is_none() && c.columns.is_none());
        assert!(!c.demote(Stage::Mesh));
        assert_eq!(c.stage, Stage::Poi);
    }

    #[test]
    fn faulted_chunks_wait_for_a_reflag() {
        let mut c = Chunk::new(ChunkCoord::new(0, 0), vec![]);
        c.zone = LodZone::None;
        c.stage = Stage::Blocks;
        c.faulted = true;
        assert_eq!(c.pending_stage(), None);
        assert!(!c.reflag());
        assert_eq!(c.pending_stage(), Some(Stage::Mesh));
    }

    #[test]
    fn reflag_releases_a_mesh_but_keeps_blocks() {
        let coord = ChunkCoord::new(1, 0);
        let mut c = Chunk::new(coord, vec![]);
        c.zone = LodZone::None;
        c.stage = Stage::Mesh;
        c.blocks = Some(Arc::new(ChunkBuf::empty(coord, 2, 0, 1)));
        c.mesh = Some(MeshCounts::default());
        assert!(c.reflag());
        assert_eq!(c.stage, Stage::Blocks);
        assert!(c.mesh.is_none());
        assert!(c.blocks.is_some());
        assert_eq!(c.pending_stage(), Some(Stage::Mesh));
    }
}
