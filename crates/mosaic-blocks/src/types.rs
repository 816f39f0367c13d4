use thiserror::Error;

/// Raw value that does not decode to a known voxel enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("unknown block kind id {0}")]
    UnknownKind(u8),
    #[error("unknown slope orientation {0}")]
    UnknownSlope(u8),
    #[error("unknown slope corner {0}")]
    UnknownCorner(u8),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BlockKind {
    #[default]
    Air = 0,
    Dirt = 1,
    Grass = 2,
    Cliff = 3,
}

impl BlockKind {
    pub const ALL: [BlockKind; 4] = [
        BlockKind::Air,
        BlockKind::Dirt,
        BlockKind::Grass,
        BlockKind::Cliff,
    ];

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_solid(self) -> bool {
        self != BlockKind::Air
    }

    /// Light passes through; faces bordering a translucent voxel are visible.
    #[inline]
    pub fn is_translucent(self) -> bool {
        !self.is_solid()
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Air => "air",
            BlockKind::Dirt => "dirt",
            BlockKind::Grass => "grass",
            BlockKind::Cliff => "cliff",
        }
    }
}

impl TryFrom<u8> for BlockKind {
    type Error = BlockError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(BlockKind::Air),
            1 => Ok(BlockKind::Dirt),
            2 => Ok(BlockKind::Grass),
            3 => Ok(BlockKind::Cliff),
            other => Err(BlockError::UnknownKind(other)),
        }
    }
}

/// Diagonal along which a sloped top face is split.
/// `Nwse` runs back-left to front-right, `Swne` front-left to back-right.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Slope {
    #[default]
    None = 0,
    Nwse = 1,
    Swne = 2,
}

impl TryFrom<u8> for Slope {
    type Error = BlockError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Slope::None),
            1 => Ok(Slope::Nwse),
            2 => Ok(Slope::Swne),
            other => Err(BlockError::UnknownSlope(other)),
        }
    }
}

/// Top corners of a voxel. Back is -Z (north), right is +X (east).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Corner {
    BackLeft = 0,
    BackRight = 1,
    FrontRight = 2,
    FrontLeft = 3,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::BackLeft,
        Corner::BackRight,
        Corner::FrontRight,
        Corner::FrontLeft,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// `(dx, dz)` of the corner relative to the voxel center, in half units.
    #[inline]
    pub fn offset(self) -> (f32, f32) {
        match self {
            Corner::BackLeft => (-0.5, -0.5),
            Corner::BackRight => (0.5, -0.5),
            Corner::FrontRight => (0.5, 0.5),
            Corner::FrontLeft => (-0.5, 0.5),
        }
    }
}

impl TryFrom<u8> for Corner {
    type Error = BlockError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Corner::ALL
            .get(v as usize)
            .copied()
            .ok_or(BlockError::UnknownCorner(v))
    }
}

/// Height offset of a lowered top corner (down to the voxel's bottom plane).
pub const CORNER_LOWERED: f32 = -1.0;

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Block {
    pub kind: BlockKind,
    pub slope: Slope,
    /// Per-corner top height offsets indexed by `Corner`, each `0.0` or `CORNER_LOWERED`.
    pub corners: [f32; 4],
}

impl Block {
    pub const AIR: Block = Block {
        kind: BlockKind::Air,
        slope: Slope::None,
        corners: [0.0; 4],
    };

    #[inline]
    pub const fn solid(kind: BlockKind) -> Block {
        Block {
            kind,
            slope: Slope::None,
            corners: [0.0; 4],
        }
    }

    /// Sloped block with the given lowered corners; `slope` picks the split diagonal.
    pub fn sloped(kind: BlockKind, slope: Slope, lowered: &[Corner]) -> Block {
        let mut corners = [0.0; 4];
        for c in lowered {
            corners[c.index()] = CORNER_LOWERED;
        }
        Block {
            kind,
            slope,
            corners,
        }
    }

    #[inline]
    pub fn is_solid(&self) -> bool {
        self.kind.is_solid()
    }

    #[inline]
    pub fn is_translucent(&self) -> bool {
        self.kind.is_translucent()
    }

    /// Only solid voxels carry slope geometry.
    #[inline]
    pub fn is_sloped(&self) -> bool {
        self.is_solid() && self.slope != Slope::None
    }

    #[inline]
    pub fn corner(&self, c: Corner) -> f32 {
        self.corners[c.index()]
    }

    /// Sum of the offsets of two corners: 0 (flat edge), -1 (one lowered) or -2.
    #[inline]
    pub fn edge_sum(&self, a: Corner, b: Corner) -> f32 {
        self.corner(a) + self.corner(b)
    }

    /// Decodes a raw kind id as stored by a persistence layer. The result is unsloped.
    pub fn from_raw(kind: u8) -> Result<Block, BlockError> {
        Ok(Block::solid(BlockKind::try_from(kind)?))
    }
}
