use core::ops::{Index, IndexMut};

use mosaic_blocks::Corner;
use mosaic_geom::Vec3;

/// The six voxel faces in emission order: right, left, front, back, up, down.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    PosX = 0,
    NegX = 1,
    PosZ = 2,
    NegZ = 3,
    PosY = 4,
    NegY = 5,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosZ,
        Direction::NegZ,
        Direction::PosY,
        Direction::NegY,
    ];

    /// Horizontal faces, in the same order as a chunk's side neighbors.
    pub const SIDES: [Direction; 4] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosZ,
        Direction::NegZ,
    ];

    /// Returns the `[0..6)` index of this face.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Bounds-checked inverse of `index`.
    #[inline]
    pub fn from_index(i: usize) -> Option<Direction> {
        Direction::ALL.get(i).copied()
    }

    #[inline]
    pub fn is_horizontal(self) -> bool {
        !matches!(self, Direction::PosY | Direction::NegY)
    }

    /// Returns the integer grid delta `(dx, dy, dz)` when stepping out of this face.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Direction::PosX => (1, 0, 0),
            Direction::NegX => (-1, 0, 0),
            Direction::PosZ => (0, 0, 1),
            Direction::NegZ => (0, 0, -1),
            Direction::PosY => (0, 1, 0),
            Direction::NegY => (0, -1, 0),
        }
    }

    #[inline]
    pub fn normal(self) -> Vec3 {
        let (x, y, z) = self.delta();
        Vec3::new(x as f32, y as f32, z as f32)
    }

    /// Indices into `CUBE` for this face. Side faces list top-a, top-b,
    /// bottom-b, bottom-a when seen from outside.
    #[inline]
    pub fn template(self) -> [usize; 4] {
        match self {
            Direction::PosX => [5, 6, 2, 1],
            Direction::NegX => [7, 4, 0, 3],
            Direction::PosZ => [4, 5, 1, 0],
            Direction::NegZ => [6, 7, 3, 2],
            Direction::PosY => [7, 6, 5, 4],
            Direction::NegY => [0, 1, 2, 3],
        }
    }

    /// Top corners at template positions 0 and 1 of a side face.
    #[inline]
    pub fn edge_corners(self) -> Option<(Corner, Corner)> {
        match self {
            Direction::PosX => Some((Corner::FrontRight, Corner::BackRight)),
            Direction::NegX => Some((Corner::BackLeft, Corner::FrontLeft)),
            Direction::PosZ => Some((Corner::FrontLeft, Corner::FrontRight)),
            Direction::NegZ => Some((Corner::BackRight, Corner::BackLeft)),
            Direction::PosY | Direction::NegY => None,
        }
    }
}

/// Unit cube around the voxel center: bottom ring `0..4`, top ring `4..8`.
pub const CUBE: [Vec3; 8] = [
    Vec3::new(-0.5, -0.5, 0.5),
    Vec3::new(0.5, -0.5, 0.5),
    Vec3::new(0.5, -0.5, -0.5),
    Vec3::new(-0.5, -0.5, -0.5),
    Vec3::new(-0.5, 0.5, 0.5),
    Vec3::new(0.5, 0.5, 0.5),
    Vec3::new(0.5, 0.5, -0.5),
    Vec3::new(-0.5, 0.5, -0.5),
];

/// Two triangles over a face template, outward winding.
pub const QUAD_TRIS: [u32; 6] = [3, 1, 0, 3, 2, 1];

/// One value per face, indexed by `Direction`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PerFace<T>(pub [T; 6]);

impl<T> Index<Direction> for PerFace<T> {
    type Output = T;
    #[inline]
    fn index(&self, d: Direction) -> &T {
        &self.0[d.index()]
    }
}

impl<T> IndexMut<Direction> for PerFace<T> {
    #[inline]
    fn index_mut(&mut self, d: Direction) -> &mut T {
        &mut self.0[d.index()]
    }
}

impl<T: Copy> PerFace<T> {
    /// `(direction, value)` pairs in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, T)> + '_ {
        Direction::ALL.into_iter().map(move |d| (d, self[d]))
    }
}
