use mosaic_blocks::{Block, BlockKind, Corner, Palette, Slope};
use mosaic_chunk::{
    BlockOverride, ChunkBuf, apply_overrides, carve_bottom, synthesize_blocks, synthesize_blocks_from,
};
use mosaic_mesh_cpu::{
    Direction, Exposure, MeshError, build_chunk_mesh, classify_faces, compute_faces,
};
use mosaic_world::{COLUMN_BORDER, ChunkCoord, TerrainColumns};

fn flat_columns(coord: ChunkCoord, width: i32, h: i32) -> TerrainColumns {
    let span = (width + 2 * COLUMN_BORDER) as usize;
    TerrainColumns::from_parts(
        coord,
        width,
        vec![h; span * span],
        vec![BlockKind::Dirt; span * span],
        32,
    )
}

fn flat_chunk(coord: ChunkCoord, width: i32, h: i32) -> ChunkBuf {
    synthesize_blocks(&flat_columns(coord, width, h))
}

fn single(block: Block) -> ChunkBuf {
    ChunkBuf::filled(ChunkCoord::new(0, 0), 1, 0, 1, block)
}

#[test]
fn isolated_voxel_is_fully_exposed() {
    let center = single(Block::solid(BlockKind::Dirt));
    let empty = single(Block::AIR);
    let (faces, counts) = compute_faces(&center, [&empty; 4]).unwrap();
    assert_eq!(faces[0].count, 6);
    for d in Direction::ALL {
        assert_eq!(faces[0].exposure[d], Exposure::Full);
    }
    assert_eq!(counts.vertices, 24);
    assert_eq!(counts.indices, 36);

    let mesh = build_chunk_mesh(&center, [&empty; 4], &Palette::default()).unwrap();
    assert_eq!(mesh.buffers.positions.len(), 24);
    assert_eq!(mesh.buffers.indices.len(), 36);
    assert_eq!(mesh.buffers.colors.len(), 24);
    for (k, d) in Direction::ALL.into_iter().enumerate() {
        for v in 0..4 {
            assert_eq!(mesh.buffers.normals[k * 4 + v], d.normal());
        }
    }
}

#[test]
fn solid_interior_has_no_visible_faces() {
    let coord = ChunkCoord::new(0, 0);
    let solid = Block::solid(BlockKind::Dirt);
    let center = ChunkBuf::filled(coord, 3, 0, 3, solid);
    let side = ChunkBuf::filled(coord, 3, 0, 3, solid);
    let faces = classify_faces(&center, [&side; 4]).unwrap();
    for z in 0..3 {
        for x in 0..3 {
            assert_eq!(faces[center.idx(x, 1, z)].count, 0);
        }
    }
    // Only the unbounded top and bottom layers show anything.
    assert!(faces[center.idx(1, 2, 1)].exposure[Direction::PosY].is_visible());
    assert!(faces[center.idx(1, 0, 1)].exposure[Direction::NegY].is_visible());
}

#[test]
fn flat_terrain_exposes_only_the_surface() {
    let c = ChunkCoord::new(0, 0);
    let center = flat_chunk(c, 4, 5);
    let sides = [
        flat_chunk(c.offset(1, 0), 4, 5),
        flat_chunk(c.offset(-1, 0), 4, 5),
        flat_chunk(c.offset(0, 1), 4, 5),
        flat_chunk(c.offset(0, -1), 4, 5),
    ];
    let faces = classify_faces(&center, [&sides[0], &sides[1], &sides[2], &sides[3]]).unwrap();
    for (i, f) in faces.iter().enumerate() {
        let y = center.bottom + (i / 16) as i32;
        if y == 5 {
            assert_eq!(f.count, 1);
            assert_eq!(f.exposure[Direction::PosY], Exposure::Full);
        } else {
            assert_eq!(f.count, 0, "y={y}");
        }
    }
}

#[test]
fn equal_heights_hide_the_shared_wall_from_both_sides() {
    let a_coord = ChunkCoord::new(0, 0);
    let b_coord = ChunkCoord::new(1, 0);
    let a = flat_chunk(a_coord, 4, 5);
    let b = flat_chunk(b_coord, 4, 5);
    let a_sides = [
        b.clone(),
        flat_chunk(a_coord.offset(-1, 0), 4, 5),
        flat_chunk(a_coord.offset(0, 1), 4, 5),
        flat_chunk(a_coord.offset(0, -1), 4, 5),
    ];
    let b_sides = [
        flat_chunk(b_coord.offset(1, 0), 4, 5),
        a.clone(),
        flat_chunk(b_coord.offset(0, 1), 4, 5),
        flat_chunk(b_coord.offset(0, -1), 4, 5),
    ];
    let fa = classify_faces(&a, [&a_sides[0], &a_sides[1], &a_sides[2], &a_sides[3]]).unwrap();
    let fb = classify_faces(&b, [&b_sides[0], &b_sides[1], &b_sides[2], &b_sides[3]]).unwrap();
    let ly = a.local_y(5).unwrap();
    for z in 0..4 {
        assert_eq!(fa[a.idx(3, ly, z)].exposure[Direction::PosX], Exposure::Hidden);
        assert_eq!(fb[b.idx(0, ly, z)].exposure[Direction::NegX], Exposure::Hidden);
    }
}

#[test]
fn two_deep_carve_shows_its_walls_and_floor() {
    let c = ChunkCoord::new(0, 0);
    let cols = flat_columns(c, 4, 5);
    let changes = [
        BlockOverride { x: 1, y: 5, z: 1, id: 0 },
        BlockOverride { x: 1, y: 4, z: 1, id: 0 },
    ];
    let mut center = synthesize_blocks_from(&cols, carve_bottom(&changes, 4).unwrap());
    assert_eq!(apply_overrides(&mut center, &cols, &changes).unwrap(), 2);
    let sides = [
        flat_chunk(c.offset(1, 0), 4, 5),
        flat_chunk(c.offset(-1, 0), 4, 5),
        flat_chunk(c.offset(0, 1), 4, 5),
        flat_chunk(c.offset(0, -1), 4, 5),
    ];
    let sides = [&sides[0], &sides[1], &sides[2], &sides[3]];
    let faces = classify_faces(&center, sides).unwrap();
    let at = |x: usize, y: i32, z: usize| faces[center.idx(x, center.local_y(y).unwrap(), z)];

    // Walls of the lower carved layer face into the shaft and nowhere else.
    for (x, z, dir) in [
        (2, 1, Direction::NegX),
        (0, 1, Direction::PosX),
        (1, 2, Direction::NegZ),
        (1, 0, Direction::PosZ),
    ] {
        let f = at(x, 4, z);
        assert_eq!(f.exposure[dir], Exposure::Full, "({x}, 4, {z})");
        assert_eq!(f.exposure[Direction::NegY], Exposure::Hidden, "({x}, 4, {z})");
        assert_eq!(f.count, 1, "({x}, 4, {z})");
    }
    // The shaft has a floor.
    let floor = at(1, 3, 1);
    assert_eq!(floor.exposure[Direction::PosY], Exposure::Full);
    assert_eq!(floor.count, 1);
    // Below it everything stays enclosed.
    for f in &faces[..center.layer_len()] {
        assert_eq!(f.count, 0);
    }

    let mesh = build_chunk_mesh(&center, sides, &Palette::default()).unwrap();
    // 15 surface tops, 4 + 4 shaft walls, 1 shaft floor.
    assert_eq!(mesh.counts.indices, (15 + 8 + 1) * 6);
}

/// Columns at height 6 that drop to 4 from span column `low_from` onward.
fn step_columns(coord: ChunkCoord, width: i32, low_from: usize) -> TerrainColumns {
    let span = (width + 2 * COLUMN_BORDER) as usize;
    let mut hs = vec![6; span * span];
    for lz in 0..span {
        for lx in low_from..span {
            hs[lz * span + lx] = 4;
        }
    }
    TerrainColumns::from_parts(coord, width, hs, vec![BlockKind::Dirt; span * span], 32)
}

#[test]
fn lower_neighbor_exposes_the_step() {
    let c = ChunkCoord::new(0, 0);
    let border = COLUMN_BORDER as usize;
    let center = synthesize_blocks(&step_columns(c, 2, 2 + border));
    let right = synthesize_blocks(&step_columns(c.offset(1, 0), 2, border));
    let others = [
        flat_chunk(c.offset(-1, 0), 2, 6),
        flat_chunk(c.offset(0, 1), 2, 6),
        flat_chunk(c.offset(0, -1), 2, 6),
    ];
    let faces = classify_faces(&center, [&right, &others[0], &others[1], &others[2]]).unwrap();
    for y in 5..=6 {
        let ly = center.local_y(y).unwrap();
        assert_eq!(faces[center.idx(1, ly, 0)].exposure[Direction::PosX], Exposure::Full, "y={y}");
    }
    let ly = center.local_y(4).unwrap();
    assert_eq!(faces[center.idx(1, ly, 0)].exposure[Direction::PosX], Exposure::Hidden);
}

#[test]
fn neighbor_outside_its_buffer_is_an_error() {
    let c = ChunkCoord::new(0, 0);
    let center = ChunkBuf::filled(c, 2, 0, 4, Block::solid(BlockKind::Dirt));
    let short = ChunkBuf::filled(c.offset(1, 0), 2, 2, 2, Block::solid(BlockKind::Dirt));
    let other = ChunkBuf::filled(c, 2, 0, 4, Block::AIR);
    let err = classify_faces(&center, [&short, &other, &other, &other]).unwrap_err();
    assert!(matches!(
        err,
        MeshError::AdjacentIndexOutOfRange {
            dir: Direction::PosX,
            ..
        }
    ));
}

#[test]
fn mismatched_neighbor_width_is_an_error() {
    let c = ChunkCoord::new(0, 0);
    let center = ChunkBuf::filled(c, 2, 0, 1, Block::AIR);
    let wide = ChunkBuf::filled(c, 3, 0, 1, Block::AIR);
    let err = classify_faces(&center, [&wide, &center, &center, &center]).unwrap_err();
    assert!(matches!(err, MeshError::WidthMismatch { expected: 2, got: 3, .. }));
}

fn lowered_on_edge(lowered: &[Corner], dir: Direction) -> usize {
    let (a, b) = dir.edge_corners().unwrap();
    lowered.iter().filter(|c| **c == a || **c == b).count()
}

// Every corner subset of a sloped voxel against air, flat solid and sloped
// solid neighbors, on each side.
#[test]
fn half_face_rule_holds_for_every_corner_and_neighbor_pair() {
    let neighbors = [
        ("air", Block::AIR),
        ("flat", Block::solid(BlockKind::Dirt)),
        (
            "sloped",
            Block::sloped(BlockKind::Cliff, Slope::Nwse, &[Corner::FrontLeft, Corner::FrontRight]),
        ),
    ];
    for mask in 0u8..16 {
        let lowered: Vec<Corner> = Corner::ALL
            .into_iter()
            .filter(|c| mask & (1 << c.index()) != 0)
            .collect();
        for slope in [Slope::Nwse, Slope::Swne] {
            let block = Block::sloped(BlockKind::Cliff, slope, &lowered);
            let center = single(block);
            for (name, nb) in neighbors {
                let side = single(nb);
                let faces = classify_faces(&center, [&side; 4]).unwrap();
                for dir in Direction::SIDES {
                    let expected = match (lowered_on_edge(&lowered, dir), name) {
                        (2, _) => Exposure::Hidden,
                        (1, "air") => Exposure::HalfOut,
                        (1, "flat") => Exposure::HalfIn,
                        (1, _) => Exposure::Hidden,
                        (_, "air") => Exposure::Full,
                        _ => Exposure::Hidden,
                    };
                    assert_eq!(
                        faces[0].exposure[dir], expected,
                        "mask={mask:04b} {slope:?} {dir:?} neighbor={name}"
                    );
                }
            }
        }
    }
}

#[test]
fn unsloped_voxel_ignores_corner_data() {
    let block = Block::sloped(BlockKind::Dirt, Slope::None, &[Corner::FrontLeft]);
    let center = single(block);
    let air = single(Block::AIR);
    let faces = classify_faces(&center, [&air; 4]).unwrap();
    assert!(!faces[0].sloped);
    assert!(faces[0].exposure.0.iter().all(|e| *e == Exposure::Full));
}

#[test]
fn lone_ramp_emits_halves_fan_and_apex() {
    let ramp = Block::sloped(BlockKind::Cliff, Slope::Nwse, &[Corner::FrontLeft, Corner::FrontRight]);
    let center = single(ramp);
    let air = single(Block::AIR);
    let mesh = build_chunk_mesh(&center, [&air; 4], &Palette::default()).unwrap();
    let (faces, _) = compute_faces(&center, [&air; 4]).unwrap();
    let f = faces[0];
    assert_eq!(f.exposure[Direction::PosX], Exposure::HalfOut);
    assert_eq!(f.exposure[Direction::NegX], Exposure::HalfOut);
    assert_eq!(f.exposure[Direction::PosZ], Exposure::Hidden);
    assert_eq!(f.exposure[Direction::NegZ], Exposure::Full);
    // 3 + 3 + 4 (back) + 6 (fan) + 4 (bottom)
    assert_eq!(mesh.buffers.positions.len(), 20);
    assert_eq!(mesh.buffers.indices.len(), 24);
    assert!(mesh.buffers.indices.iter().all(|i| (*i as usize) < 20));
}

#[test]
fn covered_slope_still_reserves_its_apex_pair() {
    let ramp = Block::sloped(BlockKind::Cliff, Slope::Swne, &[Corner::FrontLeft, Corner::FrontRight]);
    let coord = ChunkCoord::new(0, 0);
    let mut center = ChunkBuf::filled(coord, 1, 0, 2, Block::solid(BlockKind::Dirt));
    center.set_local(0, 0, 0, ramp);
    let air = ChunkBuf::filled(coord, 1, 0, 2, Block::AIR);
    let mesh = build_chunk_mesh(&center, [&air; 4], &Palette::default()).unwrap();
    let (faces, counts) = compute_faces(&center, [&air; 4]).unwrap();
    assert!(!faces[0].exposure[Direction::PosY].is_visible());
    // Ramp: two halves, back, bottom, apex pair. Cap: four sides and top.
    assert_eq!(faces[0].vertex_count(), 3 + 3 + 4 + 4 + 2);
    assert_eq!(counts.vertices, 16 + 20);
    assert_eq!(mesh.buffers.positions.len(), counts.vertices);
    // The apex pair is never referenced and gets the fallback normal.
    let referenced: std::collections::HashSet<u32> = mesh.buffers.indices.iter().copied().collect();
    assert!(!referenced.contains(&14));
    assert!(!referenced.contains(&15));
    assert_eq!(mesh.buffers.normals[14], mosaic_geom::Vec3::UP);
}
