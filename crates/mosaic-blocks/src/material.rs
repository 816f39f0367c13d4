use serde::Deserialize;

use crate::types::BlockKind;

/// Opaque handle the renderer resolves to a real material.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// Vertex-colored opaque terrain.
    pub const TERRAIN: MaterialId = MaterialId(0);
}

pub type Rgba = [f32; 4];

/// Per-kind vertex colors.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Palette {
    #[serde(default = "default_dirt")]
    pub dirt: Rgba,
    #[serde(default = "default_grass")]
    pub grass: Rgba,
    #[serde(default = "default_cliff")]
    pub cliff: Rgba,
}

fn default_dirt() -> Rgba {
    [0.55, 0.40, 0.26, 1.0]
}
fn default_grass() -> Rgba {
    [0.30, 0.62, 0.24, 1.0]
}
fn default_cliff() -> Rgba {
    [0.52, 0.52, 0.55, 1.0]
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            dirt: default_dirt(),
            grass: default_grass(),
            cliff: default_cliff(),
        }
    }
}

impl Palette {
    /// Air never produces geometry; it maps to transparent black.
    pub fn color(&self, kind: BlockKind) -> Rgba {
        match kind {
            BlockKind::Air => [0.0; 4],
            BlockKind::Dirt => self.dirt,
            BlockKind::Grass => self.grass,
            BlockKind::Cliff => self.cliff,
        }
    }
}
