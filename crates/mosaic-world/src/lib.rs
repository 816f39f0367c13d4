//! Terrain configuration, cellular noise, and column height synthesis.
#![forbid(unsafe_code)]

pub mod cells;
pub mod config;
pub mod coord;
pub mod height;

pub use cells::{CellId, CellInfo, CellNoiseField, CellPoint, CellSample};
pub use config::{ConfigError, TerrainConfig, load_config_from_path};
pub use coord::ChunkCoord;
pub use height::{COLUMN_BORDER, ColumnSample, HeightField, TerrainColumns, VerticalBounds};
