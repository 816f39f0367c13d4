//! Headless driver: walks a viewpoint across the terrain and logs what the
//! chunk pipeline produced along the way.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mosaic_geom::Vec3;
use mosaic_runtime::{ChunkEvent, Runtime, Stage};
use mosaic_world::{TerrainConfig, load_config_from_path};

#[derive(Parser, Debug)]
#[command(name = "mosaic")]
#[command(about = "Streams voxel terrain chunks around a moving viewpoint")]
struct Args {
    /// Terrain config (TOML). Built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 120)]
    ticks: u32,

    /// World units travelled per tick
    #[arg(short, long, default_value_t = 2.0)]
    speed: f32,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    start_x: f32,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    start_z: f32,

    /// Heading in degrees; 0 walks along +X, 90 along +Z
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    heading: f32,

    /// Worker threads, overriding the config
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Default)]
struct Totals {
    meshes: usize,
    released: usize,
    live: usize,
    vertices: usize,
    triangles: usize,
    pois: usize,
    errors: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => TerrainConfig::default(),
    };
    if let Some(threads) = args.threads {
        cfg.runtime.threads = threads;
    }
    let mut runtime = Runtime::new(Arc::new(cfg))?;
    let events = runtime.events();

    let heading = args.heading.to_radians();
    let (dx, dz) = (heading.cos(), heading.sin());
    let mut totals = Totals::default();

    for tick in 0..args.ticks {
        let t = tick as f32 * args.speed;
        let viewpoint = Vec3::new(args.start_x + dx * t, 0.0, args.start_z + dz * t);
        let report = runtime.update(viewpoint);

        for event in events.try_iter() {
            match event {
                ChunkEvent::MeshReady { mesh, pois } => {
                    totals.meshes += 1;
                    totals.live += 1;
                    totals.vertices += mesh.counts.vertices;
                    totals.triangles += mesh.buffers.triangle_count();
                    totals.pois += pois.len();
                }
                ChunkEvent::MeshReleased(_) => {
                    totals.released += 1;
                    totals.live = totals.live.saturating_sub(1);
                }
            }
        }
        for err in &report.errors {
            log::warn!("tick={} {}", tick, err);
        }
        totals.errors += report.errors.len();

        if report.moved {
            log::info!(
                "tick={} view={} cells+={} advanced={} deferred={} meshes={} released={}",
                tick,
                report.view_chunk,
                report.discovered_cells,
                report.total_advanced(),
                report.deferred,
                report.meshes,
                report.released
            );
        }
    }

    let hist = runtime.stage_histogram();
    let stages: Vec<String> = Stage::ALL
        .iter()
        .map(|s| format!("{}={}", s.name(), hist[s.index()]))
        .collect();
    let cache = runtime.column_cache_stats();
    log::info!(
        "done ticks={} meshes={} live={} released={} verts={} tris={} pois={} errors={}",
        args.ticks,
        totals.meshes,
        totals.live,
        totals.released,
        totals.vertices,
        totals.triangles,
        totals.pois,
        totals.errors
    );
    log::info!(
        "cells={} frontier={} chunks={} stages[{}] column_cache hits={} misses={} evictions={}",
        runtime.cells().discovered_len(),
        runtime.cells().frontier_len(),
        runtime.chunks().len(),
        stages.join(" "),
        cache.hits,
        cache.misses,
        cache.evictions
    );
    Ok(())
}
