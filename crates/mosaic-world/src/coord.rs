use std::fmt;

use mosaic_grid::{GridKey, GridPos, WorldPos};

/// Horizontal chunk index; chunk `(cx, cz)` covers world columns
/// `[cx * width, (cx + 1) * width)` on each axis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    /// Right (+X), left (-X), front (+Z), back (-Z).
    pub const CARDINAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

    /// Cardinal offsets followed by the four diagonals.
    pub const NEIGHBORS: [(i32, i32); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];

    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn from_world(pos: WorldPos, width: i32) -> Self {
        pos.grid_pos(width).into()
    }

    /// World column of the chunk's minimum corner.
    #[inline]
    pub fn origin(self, width: i32) -> WorldPos {
        WorldPos::new(self.cx * width, self.cz * width)
    }

    #[inline]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn ring_distance(self, other: ChunkCoord) -> i32 {
        GridPos::from(self).ring_distance(other.into())
    }

    pub fn cardinal_neighbors(self) -> [ChunkCoord; 4] {
        Self::CARDINAL.map(|(dx, dz)| self.offset(dx, dz))
    }

    pub fn neighbors(self) -> [ChunkCoord; 8] {
        Self::NEIGHBORS.map(|(dx, dz)| self.offset(dx, dz))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cx, self.cz)
    }
}

impl GridKey for ChunkCoord {
    #[inline]
    fn grid_pos(self, _cell_width: i32) -> GridPos {
        GridPos::new(self.cx, self.cz)
    }
}

impl From<GridPos> for ChunkCoord {
    #[inline]
    fn from(p: GridPos) -> Self {
        ChunkCoord::new(p.x, p.z)
    }
}

impl From<ChunkCoord> for GridPos {
    #[inline]
    fn from(c: ChunkCoord) -> Self {
        GridPos::new(c.cx, c.cz)
    }
}
