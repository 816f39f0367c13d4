//! Flood-fill region discovery.
//!
//! Starting from the view chunk, each undiscovered cell is flooded over the
//! chunk grid: a chunk is a member when any of its five samples (four
//! corners and the center) lands in the cell. Cells seen along the way are
//! discovered in the same pass when their seed chunk is within the
//! discovery radius; the rest wait on a frontier until the view comes close.

use hashbrown::{HashMap, HashSet};
use mosaic_grid::SpatialGrid;
use mosaic_world::{CellId, CellInfo, CellNoiseField, ChunkCoord};

use crate::error::{PipelineError, Violation};
use crate::lifecycle::Chunk;

/// A discovered cell. Never mutated after discovery.
#[derive(Clone, Debug)]
pub struct CellRecord {
    pub info: CellInfo,
    /// Member chunks, sorted.
    pub members: Vec<ChunkCoord>,
    /// Members that also touch another cell, sorted.
    pub boundary: Vec<ChunkCoord>,
}

#[derive(Clone, Debug, Default)]
pub struct DiscoveryReport {
    /// Cells discovered by this pass, in discovery order.
    pub cells: Vec<CellId>,
    pub chunks_created: usize,
    /// Cells left on (or added to) the frontier.
    pub frontier: usize,
    pub errors: Vec<PipelineError>,
}

struct Flood {
    record: CellRecord,
    /// Undiscovered cells seen during the flood, with the chunk that saw them.
    seen: Vec<(CellId, ChunkCoord)>,
    created: usize,
}

/// Distinct cells under a chunk's corners and center, sorted.
pub fn sample_chunk_cells(field: &CellNoiseField, coord: ChunkCoord, width: i32) -> Vec<CellId> {
    let o = coord.origin(width);
    let (x0, z0) = (o.x as f32, o.z as f32);
    let w = width as f32;
    let points = [
        (x0, z0),
        (x0 + w, z0),
        (x0, z0 + w),
        (x0 + w, z0 + w),
        (x0 + w * 0.5, z0 + w * 0.5),
    ];
    let mut ids: Vec<CellId> = points.iter().map(|(x, z)| field.sample(*x, *z).id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

pub struct RegionDiscovery {
    /// Width-1 grid keyed by cell id; the flag marks "discovered".
    registry: SpatialGrid<CellRecord>,
    frontier: HashMap<CellId, ChunkCoord>,
    radius: i32,
}

impl RegionDiscovery {
    pub fn new(radius: i32) -> Self {
        Self {
            registry: SpatialGrid::new(1),
            frontier: HashMap::new(),
            radius,
        }
    }

    #[inline]
    pub fn is_discovered(&self, id: CellId) -> bool {
        self.registry.flag(id)
    }

    #[inline]
    pub fn cell(&self, id: CellId) -> Option<&CellRecord> {
        self.registry.get(id)
    }

    pub fn registry(&self) -> &SpatialGrid<CellRecord> {
        &self.registry
    }

    pub fn discovered_len(&self) -> usize {
        self.registry.flagged_len()
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Frontier cells, sorted.
    pub fn frontier(&self) -> Vec<CellId> {
        let mut ids: Vec<CellId> = self.frontier.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Discovers every reachable cell around `view`, creating member chunks
    /// in `chunks`. Runs to completion; frontier cells now in range are
    /// picked up as well.
    pub fn discover(
        &mut self,
        field: &CellNoiseField,
        chunks: &mut SpatialGrid<Chunk>,
        width: i32,
        view: ChunkCoord,
    ) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let mut pending: Vec<(CellId, ChunkCoord)> = Vec::new();
        let view_cells = match chunks.get(view) {
            Some(c) => c.cells.clone(),
            None => sample_chunk_cells(field, view, width),
        };
        let mut revived: Vec<(CellId, ChunkCoord)> = self
            .frontier
            .iter()
            .filter(|(_, seed)| seed.ring_distance(view) <= self.radius)
            .map(|(id, seed)| (*id, *seed))
            .collect();
        revived.sort_unstable();
        for (id, _) in &revived {
            self.frontier.remove(id);
        }
        // Popped last-in first-out: the view's own cells go first.
        pending.extend(revived.into_iter().rev());
        pending.extend(view_cells.into_iter().rev().map(|id| (id, view)));

        while let Some((id, seed)) = pending.pop() {
            if self.registry.flag(id) {
                continue;
            }
            let flood = match self.flood(field, chunks, width, id, seed, view) {
                Ok(f) => f,
                Err(e) => {
                    log::error!(target: "discovery", "{e}");
                    report.errors.push(e);
                    continue;
                }
            };
            report.chunks_created += flood.created;
            log::debug!(
                target: "discovery",
                "{} members={} boundary={} seed={}",
                id,
                flood.record.members.len(),
                flood.record.boundary.len(),
                seed
            );
            self.registry.set(id, flood.record);
            self.registry.set_flag(id, true);
            self.frontier.remove(&id);
            report.cells.push(id);

            for (next, at) in flood.seen {
                if self.registry.flag(next) {
                    continue;
                }
                if at.ring_distance(view) <= self.radius {
                    pending.push((next, at));
                } else {
                    self.frontier
                        .entry(next)
                        .and_modify(|seed| {
                            if at.ring_distance(view) < seed.ring_distance(view) {
                                *seed = at;
                            }
                        })
                        .or_insert(at);
                }
            }
        }
        report.frontier = self.frontier.len();
        report
    }

    /// Walks the cell's chunks with an explicit stack and a visited set owned
    /// by this call. Non-member chunks are sampled but not expanded. A
    /// non-member that does not exist yet although every cell it samples is
    /// already discovered sits on a warped island of those cells; the flood
    /// that reaches it adopts it.
    fn flood(
        &self,
        field: &CellNoiseField,
        chunks: &mut SpatialGrid<Chunk>,
        width: i32,
        id: CellId,
        seed: ChunkCoord,
        view: ChunkCoord,
    ) -> Result<Flood, PipelineError> {
        if self.registry.flag(id) {
            return Err(PipelineError::new(seed, Violation::CellRediscovered(id)));
        }
        let mut visited: HashSet<ChunkCoord> = HashSet::new();
        let mut stack = vec![seed];
        visited.insert(seed);

        let mut members = Vec::new();
        let mut boundary = Vec::new();
        // Nearest sighting of each undiscovered cell.
        let mut seen: HashMap<CellId, ChunkCoord> = HashMap::new();
        let mut created = 0;

        while let Some(pos) = stack.pop() {
            let mut cells = match chunks.get(pos) {
                Some(c) => c.cells.clone(),
                None => sample_chunk_cells(field, pos, width),
            };
            let mut fresh = false;
            for other in cells.iter().copied() {
                if other == id || self.registry.flag(other) {
                    continue;
                }
                fresh = true;
                seen.entry(other)
                    .and_modify(|at| {
                        if pos.ring_distance(view) < at.ring_distance(view) {
                            *at = pos;
                        }
                    })
                    .or_insert(pos);
            }
            let member = cells.binary_search(&id).is_ok();
            let orphan = !member && !fresh && !chunks.contains(pos);
            if !member && !orphan {
                continue;
            }
            if orphan {
                if let Err(slot) = cells.binary_search(&id) {
                    cells.insert(slot, id);
                }
            }
            if cells.len() > 1 {
                boundary.push(pos);
            }
            members.push(pos);
            if !chunks.contains(pos) {
                chunks.set(pos, Chunk::new(pos, cells));
                chunks.set_flag(pos, true);
                created += 1;
            }
            if member {
                for next in pos.cardinal_neighbors() {
                    if visited.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }

        members.sort_unstable();
        boundary.sort_unstable();
        let mut seen: Vec<(CellId, ChunkCoord)> = seen.into_iter().collect();
        seen.sort_unstable();
        Ok(Flood {
            record: CellRecord {
                info: field.cell_info(id),
                members,
                boundary,
            },
            seen,
            created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_world::TerrainConfig;

    fn setup() -> (CellNoiseField, i32) {
        let cfg = TerrainConfig::default();
        (CellNoiseField::new(&cfg.cells), cfg.chunk.width)
    }

    #[test]
    fn view_chunk_is_created_and_owned() {
        let (field, width) = setup();
        let mut chunks = SpatialGrid::new(width);
        let mut disc = RegionDiscovery::new(3);
        let view = ChunkCoord::new(0, 0);
        let report = disc.discover(&field, &mut chunks, width, view);
        assert!(report.errors.is_empty());
        let chunk = chunks.get(view).unwrap();
        assert!(chunks.flag(view));
        for id in &chunk.cells {
            assert!(disc.is_discovered(*id));
            assert!(disc.cell(*id).unwrap().members.contains(&view));
        }
    }

    #[test]
    fn second_pass_from_the_same_chunk_finds_nothing() {
        let (field, width) = setup();
        let mut chunks = SpatialGrid::new(width);
        let mut disc = RegionDiscovery::new(4);
        let view = ChunkCoord::new(2, -1);
        let first = disc.discover(&field, &mut chunks, width, view);
        assert!(!first.cells.is_empty());
        let created = chunks.len();
        let again = disc.discover(&field, &mut chunks, width, view);
        assert!(again.cells.is_empty());
        assert_eq!(again.chunks_created, 0);
        assert_eq!(chunks.len(), created);
    }

    #[test]
    fn rediscovery_is_reported() {
        let (field, width) = setup();
        let mut chunks = SpatialGrid::new(width);
        let mut disc = RegionDiscovery::new(2);
        let view = ChunkCoord::new(0, 0);
        disc.discover(&field, &mut chunks, width, view);
        let id = chunks.get(view).unwrap().cells[0];
        let err = disc.flood(&field, &mut chunks, width, id, view, view).err().unwrap();
        assert_eq!(err.violation, Violation::CellRediscovered(id));
    }

    #[test]
    fn radius_covers_the_surrounding_chunks() {
        let mut cfg = TerrainConfig::default();
        cfg.cells.edge_smoothing = 0.0;
        let (field, width) = (CellNoiseField::new(&cfg.cells), cfg.chunk.width);
        let mut chunks = SpatialGrid::new(width);
        let radius = 4;
        let mut disc = RegionDiscovery::new(radius);
        let view = ChunkCoord::new(-3, 5);
        disc.discover(&field, &mut chunks, width, view);
        for pos in mosaic_grid::GridPos::from(view).square(radius - 1) {
            assert!(chunks.contains(pos), "missing {:?}", pos);
        }
    }

    #[test]
    fn members_and_boundaries_are_consistent() {
        let (field, width) = setup();
        let mut chunks = SpatialGrid::new(width);
        let mut disc = RegionDiscovery::new(3);
        disc.discover(&field, &mut chunks, width, ChunkCoord::new(0, 0));
        for (_, rec) in disc.registry().iter() {
            assert!(!rec.members.is_empty());
            for b in &rec.boundary {
                assert!(rec.members.binary_search(b).is_ok());
                assert!(chunks.get(*b).unwrap().cells.len() > 1);
            }
            for m in &rec.members {
                assert!(chunks.get(*m).unwrap().cells.contains(&rec.info.id));
            }
        }
    }
}
