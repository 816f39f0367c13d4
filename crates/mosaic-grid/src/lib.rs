//! Sparse 2D spatial index keyed by quantized world positions.
//!
//! A `SpatialGrid` owns one optional value per grid position plus an
//! independent boolean flag. The grid grows without bound; lookups for unset
//! positions return `None`/`false`. All mutation goes through `&mut self`, so
//! the owner decides who may write (the runtime keeps a single writer).
#![forbid(unsafe_code)]

use hashbrown::{HashMap, HashSet};

/// Position in grid units (one unit = `cell_width` world voxels).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub x: i32,
    pub z: i32,
}

impl GridPos {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    #[inline]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Chebyshev distance: the index of the square ring `other` sits on around `self`.
    #[inline]
    pub fn ring_distance(self, other: GridPos) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// All positions with `ring_distance(self) <= radius`, row-major.
    pub fn square(self, radius: i32) -> impl Iterator<Item = GridPos> {
        (-radius..=radius)
            .flat_map(move |dz| (-radius..=radius).map(move |dx| self.offset(dx, dz)))
    }
}

/// Integer world position on the horizontal plane (voxel units).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct WorldPos {
    pub x: i32,
    pub z: i32,
}

impl WorldPos {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Voxel containing the continuous point `(x, z)`.
    #[inline]
    pub fn from_f32(x: f32, z: f32) -> Self {
        Self {
            x: x.floor() as i32,
            z: z.floor() as i32,
        }
    }
}

/// Anything that can be turned into a grid position for a given cell width.
pub trait GridKey: Copy {
    fn grid_pos(self, cell_width: i32) -> GridPos;
}

impl GridKey for GridPos {
    #[inline]
    fn grid_pos(self, _cell_width: i32) -> GridPos {
        self
    }
}

impl GridKey for WorldPos {
    #[inline]
    fn grid_pos(self, cell_width: i32) -> GridPos {
        GridPos {
            x: self.x.div_euclid(cell_width),
            z: self.z.div_euclid(cell_width),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SpatialGrid<T> {
    cell_width: i32,
    values: HashMap<GridPos, T>,
    flags: HashSet<GridPos>,
}

impl<T> SpatialGrid<T> {
    /// Creates an empty grid; `cell_width` is clamped to at least 1.
    pub fn new(cell_width: i32) -> Self {
        Self {
            cell_width: cell_width.max(1),
            values: HashMap::new(),
            flags: HashSet::new(),
        }
    }

    #[inline]
    pub fn cell_width(&self) -> i32 {
        self.cell_width
    }

    #[inline]
    pub fn to_grid<K: GridKey>(&self, key: K) -> GridPos {
        key.grid_pos(self.cell_width)
    }

    /// World position of the minimum corner of `pos`.
    #[inline]
    pub fn grid_origin(&self, pos: GridPos) -> WorldPos {
        WorldPos::new(pos.x * self.cell_width, pos.z * self.cell_width)
    }

    /// Stores `value`, returning the previous one at that position.
    pub fn set<K: GridKey>(&mut self, key: K, value: T) -> Option<T> {
        let pos = self.to_grid(key);
        self.values.insert(pos, value)
    }

    pub fn get<K: GridKey>(&self, key: K) -> Option<&T> {
        self.values.get(&self.to_grid(key))
    }

    pub fn get_mut<K: GridKey>(&mut self, key: K) -> Option<&mut T> {
        let pos = self.to_grid(key);
        self.values.get_mut(&pos)
    }

    pub fn remove<K: GridKey>(&mut self, key: K) -> Option<T> {
        let pos = self.to_grid(key);
        self.values.remove(&pos)
    }

    #[inline]
    pub fn contains<K: GridKey>(&self, key: K) -> bool {
        self.values.contains_key(&self.to_grid(key))
    }

    pub fn set_flag<K: GridKey>(&mut self, key: K, on: bool) {
        let pos = self.to_grid(key);
        if on {
            self.flags.insert(pos);
        } else {
            self.flags.remove(&pos);
        }
    }

    #[inline]
    pub fn flag<K: GridKey>(&self, key: K) -> bool {
        self.flags.contains(&self.to_grid(key))
    }

    pub fn flagged_len(&self) -> usize {
        self.flags.len()
    }

    /// Ring distance between two keys after quantization.
    #[inline]
    pub fn ring_distance<A: GridKey, B: GridKey>(&self, a: A, b: B) -> i32 {
        self.to_grid(a).ring_distance(self.to_grid(b))
    }

    #[inline]
    pub fn is_within_ring_distance<A: GridKey, B: GridKey>(&self, a: A, b: B, radius: i32) -> bool {
        self.ring_distance(a, b) <= radius
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridPos, &T)> {
        self.values.iter().map(|(p, v)| (*p, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (GridPos, &mut T)> {
        self.values.iter_mut().map(|(p, v)| (*p, v))
    }

    /// Occupied positions in ascending `(x, z)` order.
    pub fn positions_sorted(&self) -> Vec<GridPos> {
        let mut out: Vec<GridPos> = self.values.keys().copied().collect();
        out.sort_unstable();
        out
    }
}
