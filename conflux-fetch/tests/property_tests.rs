//! Property-based tests for tile planning and tiled fetching.
//!
//! # Invariants tested
//!
//! - **Limit:** no planned tile's longer side exceeds the configured limit.
//! - **Cover:** tiles lie inside the region and their areas sum to it.
//! - **One request per tile:** the orchestrator queries each tile once,
//!   whatever the worker count.

use conflux_core::BoundingBox;
use conflux_core::test_support::StaticGeometrySource;
use conflux_fetch::{FetchConfig, TiledFetchOrchestrator, plan_tiles};
use proptest::prelude::*;

fn region_strategy() -> impl Strategy<Value = BoundingBox> {
    (-60.0_f64..60.0, -170.0_f64..170.0, 0.0005_f64..0.05, 0.0005_f64..0.05).prop_map(
        |(lat, lon, width, height)| {
            BoundingBox::new(lon, lat, lon + width, lat + height).expect("region within range")
        },
    )
}

fn area(tile: &BoundingBox) -> f64 {
    let (min, max) = (tile.min(), tile.max());
    (max.x - min.x) * (max.y - min.y)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tiles_respect_the_side_limit(region in region_strategy(), limit in 200.0_f64..5_000.0) {
        let tiles = plan_tiles(&region, limit);
        prop_assert!(!tiles.is_empty());
        for tile in &tiles {
            prop_assert!(tile.longest_side_m() <= limit);
        }
    }

    #[test]
    fn tiles_cover_the_region(region in region_strategy(), limit in 200.0_f64..5_000.0) {
        let tiles = plan_tiles(&region, limit);
        let total: f64 = tiles.iter().map(area).sum();
        prop_assert!((total - area(&region)).abs() <= area(&region) * 1e-9);
        let (min, max) = (region.min(), region.max());
        for tile in &tiles {
            prop_assert!(tile.min().x >= min.x && tile.min().y >= min.y);
            prop_assert!(tile.max().x <= max.x && tile.max().y <= max.y);
        }
    }

    #[test]
    fn each_tile_is_requested_once(region in region_strategy(), workers in 1_usize..8) {
        let config = FetchConfig::default()
            .with_max_tile_side_m(1_000.0)
            .with_max_workers(workers);
        let orchestrator =
            TiledFetchOrchestrator::with_config(StaticGeometrySource::default(), config);
        let report = orchestrator.fetch(&region);
        prop_assert!(report.is_complete());
        prop_assert_eq!(orchestrator.source().request_count(), report.tiles.len());
        prop_assert_eq!(report.tiles, plan_tiles(&region, 1_000.0));
    }
}
