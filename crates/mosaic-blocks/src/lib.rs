//! Voxel kinds, slope shapes, and terrain colors.
#![forbid(unsafe_code)]

pub mod material;
pub mod types;

pub use material::{MaterialId, Palette, Rgba};
pub use types::{Block, BlockError, BlockKind, CORNER_LOWERED, Corner, Slope};
