use std::fs;
use std::path::{Path, PathBuf};

use mosaic_blocks::Palette;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid terrain config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("chunk width must be at least 1, got {0}")]
    ChunkWidth(i32),
    #[error("height limit {height_limit} is smaller than chunk width {width}")]
    HeightLimit { height_limit: i32, width: i32 },
    #[error("view radius must be at least 3 rings, got {0}")]
    ViewRadius(i32),
    #[error("discovery radius {discovery} is smaller than view radius {view}")]
    DiscoveryRadius { discovery: i32, view: i32 },
    #[error("cell frequency must be positive, got {0}")]
    Frequency(f32),
    #[error("cell jitter must lie in [0, 1], got {0}")]
    Jitter(f32),
    #[error("edge smoothing must not be negative, got {0}")]
    Smoothing(f32),
    #[error("height edge band must be positive, got {0}")]
    EdgeBand(f32),
}

/// Startup configuration. Every field has a default so partial TOML files load.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TerrainConfig {
    #[serde(default)]
    pub chunk: ChunkParams,
    #[serde(default)]
    pub view: ViewParams,
    #[serde(default)]
    pub cells: CellParams,
    #[serde(default)]
    pub height: HeightParams,
    #[serde(default)]
    pub terrain: TerrainParams,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub runtime: RuntimeParams,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChunkParams {
    #[serde(default = "default_chunk_width")]
    pub width: i32,
    /// Exclusive upper bound for voxel y.
    #[serde(default = "default_height_limit")]
    pub height_limit: i32,
}
fn default_chunk_width() -> i32 {
    12
}
fn default_height_limit() -> i32 {
    48
}
impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            width: default_chunk_width(),
            height_limit: default_height_limit(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ViewParams {
    /// Outermost chunk ring that stays resident.
    #[serde(default = "default_view_radius")]
    pub radius: i32,
    /// Cells first observed within this ring are discovered immediately.
    #[serde(default = "default_discovery_radius")]
    pub discovery_radius: i32,
}
fn default_view_radius() -> i32 {
    8
}
fn default_discovery_radius() -> i32 {
    14
}
impl Default for ViewParams {
    fn default() -> Self {
        Self {
            radius: default_view_radius(),
            discovery_radius: default_discovery_radius(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CellParams {
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default = "default_cell_frequency")]
    pub frequency: f32,
    /// Domain-warp amplitude in world units; 0 gives straight cell edges.
    #[serde(default = "default_edge_smoothing")]
    pub edge_smoothing: f32,
    #[serde(default = "default_jitter")]
    pub jitter: f32,
}
fn default_seed() -> i32 {
    5678
}
fn default_cell_frequency() -> f32 {
    0.02
}
fn default_edge_smoothing() -> f32 {
    10.0
}
fn default_jitter() -> f32 {
    0.15
}
impl Default for CellParams {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            frequency: default_cell_frequency(),
            edge_smoothing: default_edge_smoothing(),
            jitter: default_jitter(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct HeightParams {
    #[serde(default = "default_base")]
    pub base: f32,
    #[serde(default = "default_cell_amplitude")]
    pub cell_amplitude: f32,
    /// Width (world units of edge distance) over which plateaus blend toward their neighbor.
    #[serde(default = "default_edge_band")]
    pub edge_band: f32,
    #[serde(default = "default_detail_frequency")]
    pub detail_frequency: f32,
    #[serde(default = "default_detail_amplitude")]
    pub detail_amplitude: f32,
}
fn default_base() -> f32 {
    4.0
}
fn default_cell_amplitude() -> f32 {
    24.0
}
fn default_edge_band() -> f32 {
    6.0
}
fn default_detail_frequency() -> f32 {
    0.05
}
fn default_detail_amplitude() -> f32 {
    1.5
}
impl Default for HeightParams {
    fn default() -> Self {
        Self {
            base: default_base(),
            cell_amplitude: default_cell_amplitude(),
            edge_band: default_edge_band(),
            detail_frequency: default_detail_frequency(),
            detail_amplitude: default_detail_amplitude(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainParams {
    #[serde(default = "default_cliff_edge_distance")]
    pub cliff_edge_distance: f32,
    /// Plateau height difference (voxels) that turns an edge band into cliff.
    #[serde(default = "default_cliff_min_step")]
    pub cliff_min_step: f32,
    #[serde(default = "default_grass_threshold")]
    pub grass_threshold: f32,
}
fn default_cliff_edge_distance() -> f32 {
    2.5
}
fn default_cliff_min_step() -> f32 {
    3.0
}
fn default_grass_threshold() -> f32 {
    0.5
}
impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            cliff_edge_distance: default_cliff_edge_distance(),
            cliff_min_step: default_cliff_min_step(),
            grass_threshold: default_grass_threshold(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RuntimeParams {
    /// Worker threads for stage batches; 0 lets rayon choose.
    #[serde(default)]
    pub threads: usize,
}

impl TerrainConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: TerrainConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.chunk.width;
        if width < 1 {
            return Err(ConfigError::ChunkWidth(width));
        }
        if self.chunk.height_limit < width {
            return Err(ConfigError::HeightLimit {
                height_limit: self.chunk.height_limit,
                width,
            });
        }
        if self.view.radius < 3 {
            return Err(ConfigError::ViewRadius(self.view.radius));
        }
        if self.view.discovery_radius < self.view.radius {
            return Err(ConfigError::DiscoveryRadius {
                discovery: self.view.discovery_radius,
                view: self.view.radius,
            });
        }
        if !(self.cells.frequency > 0.0) {
            return Err(ConfigError::Frequency(self.cells.frequency));
        }
        if !(0.0..=1.0).contains(&self.cells.jitter) {
            return Err(ConfigError::Jitter(self.cells.jitter));
        }
        if !(self.cells.edge_smoothing >= 0.0) {
            return Err(ConfigError::Smoothing(self.cells.edge_smoothing));
        }
        if !(self.height.edge_band > 0.0) {
            return Err(ConfigError::EdgeBand(self.height.edge_band));
        }
        Ok(())
    }
}

/// Reads, parses and validates a TOML config file.
pub fn load_config_from_path(path: &Path) -> Result<TerrainConfig, ConfigError> {
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    TerrainConfig::from_toml_str(&s)
}
