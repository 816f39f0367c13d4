//! Chunk lifecycle driver: region discovery, staged generation batches, and
//! level of detail around a moving viewpoint.
#![forbid(unsafe_code)]

mod column_cache;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::HashMap;
use mosaic_chunk::{
    BlockOverride, ChunkBuf, apply_overrides, carve_bottom, open_border_walls, synthesize_blocks,
    synthesize_blocks_from,
};
use mosaic_geom::Vec3;
use mosaic_grid::{SpatialGrid, WorldPos};
use mosaic_mesh_cpu::{ChunkMesh, build_chunk_mesh};
use mosaic_world::{CellId, CellNoiseField, ChunkCoord, HeightField, TerrainColumns, TerrainConfig};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::column_cache::ColumnCache;

pub use column_cache::ColumnCacheStats;
pub use discovery::{CellRecord, DiscoveryReport, RegionDiscovery, sample_chunk_cells};
pub use error::{PipelineError, RuntimeError, Violation};
pub use lifecycle::{CellCover, Chunk, LodZone, Poi, Stage};
pub use store::{ChangeStore, MemoryChangeStore};

/// Messages for the rendering collaborator.
#[derive(Debug)]
pub enum ChunkEvent {
    /// A finished mesh; the runtime keeps only its counts.
    MeshReady { mesh: ChunkMesh, pois: Vec<Poi> },
    /// The renderer should drop the mesh it holds for this chunk.
    MeshReleased(ChunkCoord),
}

#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub view_chunk: ChunkCoord,
    /// The view entered a new chunk this tick.
    pub moved: bool,
    pub discovered_cells: usize,
    /// Chunks that completed each stage, indexed by `Stage::index`.
    pub advanced: [usize; Stage::COUNT],
    /// Chunks whose next stage was allowed but whose inputs were not ready.
    pub deferred: usize,
    pub meshes: usize,
    pub released: usize,
    pub errors: Vec<PipelineError>,
}

impl TickReport {
    pub fn total_advanced(&self) -> usize {
        self.advanced.iter().sum()
    }
}

pub struct Runtime {
    cfg: Arc<TerrainConfig>,
    field: HeightField,
    chunks: SpatialGrid<Chunk>,
    discovery: RegionDiscovery,
    column_cache: ColumnCache,
    store: Option<Arc<dyn ChangeStore>>,
    pool: ThreadPool,
    view: Option<ChunkCoord>,
    events_tx: Sender<ChunkEvent>,
    events_rx: Receiver<ChunkEvent>,
}

impl Runtime {
    pub fn new(cfg: Arc<TerrainConfig>) -> Result<Self, RuntimeError> {
        cfg.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(cfg.runtime.threads)
            .thread_name(|i| format!("mosaic-gen-{i}"))
            .build()?;
        let side = 2 * cfg.view.radius.max(0) as usize + 3;
        let (events_tx, events_rx) = unbounded();
        log::info!(
            target: "lifecycle",
            "runtime ready width={} view={} discovery={} threads={}",
            cfg.chunk.width,
            cfg.view.radius,
            cfg.view.discovery_radius,
            pool.current_num_threads()
        );
        Ok(Self {
            field: HeightField::new(&cfg),
            chunks: SpatialGrid::new(cfg.chunk.width),
            discovery: RegionDiscovery::new(cfg.view.discovery_radius),
            column_cache: ColumnCache::new(side * side),
            store: None,
            pool,
            view: None,
            events_tx,
            events_rx,
            cfg,
        })
    }

    pub fn with_change_store(mut self, store: Arc<dyn ChangeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Receiving end of the mesh event stream.
    pub fn events(&self) -> Receiver<ChunkEvent> {
        self.events_rx.clone()
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.cfg
    }

    pub fn view_chunk(&self) -> Option<ChunkCoord> {
        self.view
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(coord)
    }

    pub fn chunks(&self) -> &SpatialGrid<Chunk> {
        &self.chunks
    }

    pub fn cells(&self) -> &RegionDiscovery {
        &self.discovery
    }

    pub fn column_cache_stats(&self) -> ColumnCacheStats {
        self.column_cache.stats()
    }

    /// Number of chunks at each stage, indexed by `Stage::index`.
    pub fn stage_histogram(&self) -> [usize; Stage::COUNT] {
        let mut out = [0; Stage::COUNT];
        for (_, c) in self.chunks.iter() {
            out[c.stage.index()] += 1;
        }
        out
    }

    /// Advances the pipeline one tick for the given viewpoint. Discovery and
    /// zoning only rerun when the viewpoint crosses into another chunk.
    pub fn update(&mut self, viewpoint: Vec3) -> TickReport {
        let t0 = Instant::now();
        let width = self.cfg.chunk.width;
        let view = ChunkCoord::from_world(WorldPos::from_f32(viewpoint.x, viewpoint.z), width);
        let mut report = TickReport {
            view_chunk: view,
            ..TickReport::default()
        };

        if self.view != Some(view) {
            report.moved = true;
            self.view = Some(view);
            let disc = self
                .discovery
                .discover(self.field.cells(), &mut self.chunks, width, view);
            report.discovered_cells = disc.cells.len();
            report.errors.extend(disc.errors);
            log::info!(
                target: "discovery",
                "view={} cells+={} chunks+={} discovered={} frontier={}",
                view,
                disc.cells.len(),
                disc.chunks_created,
                self.discovery.discovered_len(),
                disc.frontier
            );
            self.rezone(view, &mut report);
        }

        for stage in Stage::ALL.into_iter().skip(1) {
            self.run_stage(stage, &mut report);
        }

        log::debug!(
            target: "perf",
            "ms={} tick view={} advanced={} deferred={} meshes={} released={} errors={}",
            t0.elapsed().as_millis(),
            view,
            report.total_advanced(),
            report.deferred,
            report.meshes,
            report.released,
            report.errors.len()
        );
        report
    }

    /// Persisted changes for `coord` were updated. The chunk and its eight
    /// neighbors rebuild their blocks, since carves deepen the buffers and
    /// reopen walls around them; meshed chunks beside any of them remesh.
    pub fn reload_changes(&mut self, coord: ChunkCoord) {
        let mut released = Vec::new();
        let mut lost_blocks = Vec::new();
        for pos in std::iter::once(coord).chain(coord.neighbors()) {
            let Some(c) = self.chunks.get_mut(pos) else {
                continue;
            };
            c.faulted = false;
            let had_blocks = c.blocks.is_some();
            if c.demote(Stage::Height) {
                released.push(pos);
            }
            if had_blocks && c.blocks.is_none() {
                lost_blocks.push(pos);
            }
        }
        self.reflag_neighbors(&lost_blocks, &mut released);
        released.sort_unstable();
        released.dedup();
        for coord in released {
            let _ = self.events_tx.send(ChunkEvent::MeshReleased(coord));
        }
    }

    /// Recomputes every chunk's zone and drops what the new zone no longer allows.
    fn rezone(&mut self, view: ChunkCoord, report: &mut TickReport) {
        let radius = self.cfg.view.radius;
        let mut lost_blocks = Vec::new();
        let mut released = Vec::new();
        for (pos, chunk) in self.chunks.iter_mut() {
            let zone = LodZone::for_ring(ChunkCoord::from(pos).ring_distance(view), radius);
            if zone == chunk.zone {
                continue;
            }
            chunk.zone = zone;
            chunk.faulted = false;
            let cap = zone.stage_cap();
            if cap < Stage::Height {
                if let Some(cols) = chunk.columns.take() {
                    self.column_cache.insert(cols);
                }
            }
            let had_blocks = chunk.blocks.is_some();
            if chunk.demote(cap) {
                released.push(chunk.coord);
            }
            if had_blocks && chunk.blocks.is_none() {
                lost_blocks.push(chunk.coord);
            }
        }
        lost_blocks.sort_unstable();
        self.reflag_neighbors(&lost_blocks, &mut released);
        released.sort_unstable();
        released.dedup();
        for coord in released {
            log::debug!(target: "lifecycle", "release mesh {}", coord);
            let _ = self.events_tx.send(ChunkEvent::MeshReleased(coord));
            report.released += 1;
        }
    }

    /// Neighbors of chunks that lost their voxels must redo face visibility.
    fn reflag_neighbors(&mut self, changed: &[ChunkCoord], released: &mut Vec<ChunkCoord>) {
        for coord in changed {
            for n in coord.cardinal_neighbors() {
                if let Some(c) = self.chunks.get_mut(n) {
                    if c.reflag() {
                        released.push(n);
                    }
                }
            }
        }
    }

    fn ready_for(&self, stage: Stage) -> Vec<ChunkCoord> {
        self.chunks
            .positions_sorted()
            .into_iter()
            .filter_map(|pos| self.chunks.get(pos))
            .filter(|c| c.pending_stage() == Some(stage))
            .map(|c| c.coord)
            .collect()
    }

    fn run_stage(&mut self, stage: Stage, report: &mut TickReport) {
        let ready = self.ready_for(stage);
        if ready.is_empty() {
            return;
        }
        let t0 = Instant::now();
        let queued = ready.len();
        let advanced = match stage {
            Stage::Create => 0,
            Stage::Cell => self.run_cells(ready),
            Stage::Poi => self.run_pois(ready),
            Stage::Height => self.run_heights(ready),
            Stage::Blocks => self.run_blocks(ready, report),
            Stage::Mesh => self.run_meshes(ready, report),
        };
        report.advanced[stage.index()] += advanced;
        log::debug!(
            target: "perf",
            "ms={} stage={} queued={} advanced={}",
            t0.elapsed().as_millis(),
            stage.name(),
            queued,
            advanced
        );
    }

    fn run_cells(&mut self, ready: Vec<ChunkCoord>) -> usize {
        let width = self.cfg.chunk.width;
        let cells = self.field.cells();
        let covers: Vec<(ChunkCoord, CellCover)> = self.pool.install(|| {
            ready
                .into_par_iter()
                .map(|coord| (coord, scan_cover(cells, coord, width)))
                .collect()
        });
        let n = covers.len();
        for (coord, cover) in covers {
            if let Some(c) = self.chunks.get_mut(coord) {
                c.cover = Some(cover);
                c.stage = Stage::Cell;
            }
        }
        n
    }

    fn run_pois(&mut self, ready: Vec<ChunkCoord>) -> usize {
        let width = self.cfg.chunk.width;
        let cells = self.field.cells();
        let found: Vec<(ChunkCoord, Vec<Poi>)> = self.pool.install(|| {
            ready
                .into_par_iter()
                .map(|coord| (coord, find_pois(cells, coord, width)))
                .collect()
        });
        let n = found.len();
        for (coord, pois) in found {
            if let Some(c) = self.chunks.get_mut(coord) {
                c.pois = pois;
                c.stage = Stage::Poi;
            }
        }
        n
    }

    fn run_heights(&mut self, ready: Vec<ChunkCoord>) -> usize {
        let width = self.cfg.chunk.width;
        let mut done: Vec<(ChunkCoord, Arc<TerrainColumns>)> = Vec::with_capacity(ready.len());
        let mut todo = Vec::new();
        for coord in ready {
            match self.column_cache.take(coord) {
                Some(cols) => done.push((coord, cols)),
                None => todo.push(coord),
            }
        }
        let field = &self.field;
        let generated: Vec<(ChunkCoord, Arc<TerrainColumns>)> = self.pool.install(|| {
            todo.into_par_iter()
                .map(|coord| (coord, Arc::new(TerrainColumns::generate(field, coord, width))))
                .collect()
        });
        done.extend(generated);
        let n = done.len();
        for (coord, cols) in done {
            if let Some(c) = self.chunks.get_mut(coord) {
                c.columns = Some(cols);
                c.stage = Stage::Height;
            }
        }
        n
    }

    fn run_blocks(&mut self, ready: Vec<ChunkCoord>, report: &mut TickReport) -> usize {
        let mut inputs = Vec::with_capacity(ready.len());
        for coord in ready {
            match self.chunks.get(coord).and_then(|c| c.columns.clone()) {
                Some(cols) => inputs.push((coord, cols)),
                None => report.deferred += 1,
            }
        }
        let store = self.store.clone();
        let built: Vec<(ChunkCoord, Result<ChunkBuf, Violation>)> = self.pool.install(|| {
            inputs
                .into_par_iter()
                .map(|(coord, cols)| (coord, build_blocks(&cols, store.as_deref())))
                .collect()
        });
        let mut n = 0;
        for (coord, result) in built {
            match result {
                Ok(buf) => {
                    if let Some(c) = self.chunks.get_mut(coord) {
                        c.blocks = Some(Arc::new(buf));
                        c.stage = Stage::Blocks;
                        n += 1;
                    }
                }
                Err(v) => self.fault(PipelineError::new(coord, v), report),
            }
        }
        n
    }

    fn run_meshes(&mut self, ready: Vec<ChunkCoord>, report: &mut TickReport) -> usize {
        let mut inputs = Vec::with_capacity(ready.len());
        for coord in ready {
            match self.mesh_inputs(coord) {
                Ok(Some(input)) => inputs.push(input),
                Ok(None) => report.deferred += 1,
                Err(e) => self.fault(e, report),
            }
        }
        let palette = &self.cfg.palette;
        let built: Vec<_> = self.pool.install(|| {
            inputs
                .into_par_iter()
                .map(|input| {
                    let [a, b, c, d] = &input.sides;
                    let sides = [a.as_ref(), b.as_ref(), c.as_ref(), d.as_ref()];
                    (input.coord, build_chunk_mesh(&input.center, sides, palette))
                })
                .collect()
        });
        let mut n = 0;
        for (coord, result) in built {
            match result {
                Ok(mesh) => {
                    let Some(c) = self.chunks.get_mut(coord) else {
                        continue;
                    };
                    c.mesh = Some(mesh.counts);
                    c.stage = Stage::Mesh;
                    let pois = c.pois.clone();
                    let _ = self.events_tx.send(ChunkEvent::MeshReady { mesh, pois });
                    report.meshes += 1;
                    n += 1;
                }
                Err(e) => self.fault(PipelineError::new(coord, e), report),
            }
        }
        n
    }

    /// `Ok(None)` when a neighbor is missing, dormant, or behind BLOCKS.
    fn mesh_inputs(&self, coord: ChunkCoord) -> Result<Option<MeshInput>, PipelineError> {
        for n in coord.neighbors() {
            match self.chunks.get(n) {
                Some(c) if c.is_active() => {}
                _ => return Ok(None),
            }
        }
        let mut sides = Vec::with_capacity(4);
        for n in coord.cardinal_neighbors() {
            let Some(c) = self.chunks.get(n) else {
                return Ok(None);
            };
            if c.stage < Stage::Blocks {
                return Ok(None);
            }
            match &c.blocks {
                Some(b) => sides.push(Arc::clone(b)),
                None => return Err(PipelineError::new(coord, Violation::MissingBlocks(n))),
            }
        }
        let center = self
            .chunks
            .get(coord)
            .and_then(|c| c.blocks.clone())
            .ok_or_else(|| PipelineError::new(coord, Violation::MissingBlocks(coord)))?;
        let sides: [Arc<ChunkBuf>; 4] = match sides.try_into() {
            Ok(s) => s,
            Err(_) => return Ok(None),
        };
        Ok(Some(MeshInput {
            coord,
            center,
            sides,
        }))
    }

    fn fault(&mut self, err: PipelineError, report: &mut TickReport) {
        log::error!(target: "pipeline", "{err}");
        if let Some(c) = self.chunks.get_mut(err.coord) {
            c.faulted = true;
        }
        report.errors.push(err);
    }
}

struct MeshInput {
    coord: ChunkCoord,
    center: Arc<ChunkBuf>,
    /// Cardinal neighbors in `ChunkCoord::CARDINAL` order.
    sides: [Arc<ChunkBuf>; 4],
}

/// Synthesis plus persisted changes. The buffer is deepened to make room
/// for carves in this chunk and its eight neighbors, and walls beside the
/// side neighbors' carves are reopened.
fn build_blocks(cols: &TerrainColumns, store: Option<&dyn ChangeStore>) -> Result<ChunkBuf, Violation> {
    let Some(store) = store else {
        return Ok(synthesize_blocks(cols));
    };
    let coord = cols.coord;
    let own = store.overrides(coord);
    let around: Vec<((i32, i32), Vec<BlockOverride>)> = ChunkCoord::NEIGHBORS
        .iter()
        .filter_map(|&(dx, dz)| store.overrides(coord.offset(dx, dz)).map(|o| ((dx, dz), o)))
        .collect();

    let bottom = own
        .iter()
        .chain(around.iter().map(|(_, o)| o))
        .filter_map(|o| carve_bottom(o, cols.width))
        .min();
    let mut buf = match bottom {
        Some(b) => synthesize_blocks_from(cols, b),
        None => synthesize_blocks(cols),
    };
    if let Some(changes) = &own {
        let applied = apply_overrides(&mut buf, cols, changes)?;
        log::debug!(target: "lifecycle", "chunk {} overrides applied={}", coord, applied);
    }
    for (offset, changes) in &around {
        if ChunkCoord::CARDINAL.contains(offset) {
            open_border_walls(&mut buf, *offset, changes);
        }
    }
    Ok(buf)
}

/// Cell of every column in the chunk, sampled where height synthesis samples.
fn scan_cover(cells: &CellNoiseField, coord: ChunkCoord, width: i32) -> CellCover {
    let o = coord.origin(width);
    let mut counts: HashMap<CellId, usize> = HashMap::new();
    for lz in 0..width {
        for lx in 0..width {
            let s = cells.sample((o.x + lx) as f32 + 0.5, (o.z + lz) as f32 + 0.5);
            *counts.entry(s.id).or_insert(0) += 1;
        }
    }
    let mut ids: Vec<(CellId, usize)> = counts.into_iter().collect();
    ids.sort_unstable();
    let owner = ids
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(id, _)| *id)
        .unwrap_or(CellId::new(0, 0));
    CellCover {
        owner,
        cells: ids.into_iter().map(|(id, _)| id).collect(),
    }
}

fn find_pois(cells: &CellNoiseField, coord: ChunkCoord, width: i32) -> Vec<Poi> {
    let o = coord.origin(width);
    let (x0, z0) = (o.x as f32, o.z as f32);
    let w = width as f32;
    cells
        .feature_points_in(x0, z0, x0 + w, z0 + w)
        .into_iter()
        .map(|info| {
            let p = WorldPos::from_f32(info.position.x, info.position.z);
            Poi {
                cell: info.id,
                column: (p.x - o.x, p.z - o.z),
            }
        })
        .collect()
}
