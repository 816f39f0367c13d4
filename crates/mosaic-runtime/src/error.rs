use mosaic_blocks::BlockError;
use mosaic_mesh_cpu::MeshError;
use mosaic_world::{CellId, ChunkCoord, ConfigError};
use thiserror::Error;

/// A broken ordering guarantee detected while running a chunk's stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error("{0} was discovered twice")]
    CellRediscovered(CellId),
    #[error("chunk {0} is past BLOCKS but holds no voxels")]
    MissingBlocks(ChunkCoord),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("chunk {coord}: {violation}")]
pub struct PipelineError {
    pub coord: ChunkCoord,
    pub violation: Violation,
}

impl PipelineError {
    pub fn new(coord: ChunkCoord, violation: impl Into<Violation>) -> Self {
        Self {
            coord,
            violation: violation.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
