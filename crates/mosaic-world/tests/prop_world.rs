use mosaic_world::{
    COLUMN_BORDER, CellNoiseField, ChunkCoord, HeightField, TerrainColumns, TerrainConfig,
};
use proptest::prelude::*;

fn config(seed: i32) -> TerrainConfig {
    let mut cfg = TerrainConfig::default();
    cfg.cells.seed = seed;
    cfg
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cell_sampling_is_deterministic(seed in any::<i32>(), x in -5_000.0f32..5_000.0, z in -5_000.0f32..5_000.0) {
        let cfg = config(seed);
        let a = CellNoiseField::new(&cfg.cells);
        let b = CellNoiseField::new(&cfg.cells);
        let s1 = a.sample(x, z);
        let s2 = a.sample(x, z);
        let s3 = b.sample(x, z);
        prop_assert_eq!(s1, s2);
        prop_assert_eq!(s1.id, s3.id);
        prop_assert_eq!(s1.value, s3.value);
        prop_assert_eq!(s1.edge_distance, s3.edge_distance);
        prop_assert!(s1.edge_distance >= 0.0);
        prop_assert!((0.0..1.0).contains(&s1.value));
    }

    // Neighboring chunks sample the shared edge columns themselves (through
    // their border ring) and must agree exactly.
    #[test]
    fn neighboring_chunks_agree_on_shared_columns(seed in any::<i32>(), cx in -50i32..50, cz in -50i32..50) {
        let cfg = config(seed);
        let width = 6;
        let field = HeightField::new(&cfg);
        let a = TerrainColumns::generate(&field, ChunkCoord::new(cx, cz), width);
        let b = TerrainColumns::generate(&field, ChunkCoord::new(cx + 1, cz), width);
        for lz in -COLUMN_BORDER..width + COLUMN_BORDER {
            for k in -COLUMN_BORDER..COLUMN_BORDER {
                // Column `width + k` of a is column `k` of b.
                prop_assert_eq!(a.height(width + k, lz), b.height(k, lz));
                prop_assert_eq!(a.kind(width + k, lz), b.kind(k, lz));
            }
        }
        let c = TerrainColumns::generate(&field, ChunkCoord::new(cx, cz + 1), width);
        for lx in -COLUMN_BORDER..width + COLUMN_BORDER {
            prop_assert_eq!(a.height(lx, width - 1), c.height(lx, -1));
            prop_assert_eq!(a.height(lx, width), c.height(lx, 0));
        }
    }

    #[test]
    fn columns_stay_inside_bounds(seed in any::<i32>(), cx in -20i32..20, cz in -20i32..20) {
        let cfg = config(seed);
        let field = HeightField::new(&cfg);
        let cols = TerrainColumns::generate(&field, ChunkCoord::new(cx, cz), cfg.chunk.width);
        let b = cols.bounds;
        prop_assert!(b.bottom >= 0);
        prop_assert!(b.top < cfg.chunk.height_limit);
        for lz in -1..cfg.chunk.width + 1 {
            for lx in -1..cfg.chunk.width + 1 {
                let h = cols.height(lx, lz);
                prop_assert!(h >= 1);
                prop_assert!(h < b.top);
                prop_assert!(cols.floor(lx, lz) > b.bottom);
            }
        }
    }
}
