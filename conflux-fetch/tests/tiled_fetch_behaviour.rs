//! Behavioural tests for [`TiledFetchOrchestrator`].
//!
//! These tests use the in-memory `StaticGeometrySource` so tiling, partial
//! failure, and merging can be checked without a tile service.

use std::cell::RefCell;

use conflux_core::test_support::StaticGeometrySource;
use conflux_core::{BoundingBox, Feature, Tags};
use conflux_fetch::{FetchConfig, FetchReport, TiledFetchOrchestrator};
use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Debug, Default)]
struct FetchWorld {
    source: RefCell<Option<StaticGeometrySource>>,
    report: RefCell<Option<FetchReport>>,
}

#[fixture]
fn world() -> FetchWorld {
    FetchWorld::default()
}

fn region() -> BoundingBox {
    BoundingBox::new(0.0, 0.0, 0.02, 0.01).expect("valid region")
}

fn street() -> Feature {
    let tags = Tags::from([("highway".to_owned(), "residential".to_owned())]);
    Feature::line(
        vec![
            Coord { x: 0.004, y: 0.005 },
            Coord { x: 0.008, y: 0.005 },
            Coord { x: 0.016, y: 0.005 },
        ],
        tags,
    )
}

fn with_report<T>(world: &FetchWorld, check: impl FnOnce(&FetchReport) -> T) -> T {
    let report = world.report.borrow();
    check(report.as_ref().expect("fetch must have run"))
}

#[given("a source with a street crossing the middle of the region")]
fn source_with_street(#[from(world)] world: &FetchWorld) {
    world
        .source
        .replace(Some(StaticGeometrySource::with_features([street()])));
}

#[given("the eastern tile fails")]
fn eastern_tile_fails(#[from(world)] world: &FetchWorld) {
    let source = world.source.take().expect("source configured");
    world
        .source
        .replace(Some(source.failing_at(Coord { x: 0.019, y: 0.009 })));
}

#[when("I fetch the region with tiles of at most {limit} metres")]
fn fetch_region(limit: f64, #[from(world)] world: &FetchWorld) {
    let source = world.source.take().expect("source configured");
    let config = FetchConfig::default()
        .with_max_tile_side_m(limit)
        .with_max_workers(2);
    let report = TiledFetchOrchestrator::with_config(source, config).fetch(&region());
    world.report.replace(Some(report));
}

#[then("two tiles are fetched")]
fn two_tiles(#[from(world)] world: &FetchWorld) {
    with_report(world, |report| assert_eq!(report.tiles.len(), 2));
}

#[then("one tile is fetched")]
fn one_tile(#[from(world)] world: &FetchWorld) {
    with_report(world, |report| assert_eq!(report.tiles, vec![region()]));
}

#[then("the street arrives once from each tile")]
fn street_per_tile(#[from(world)] world: &FetchWorld) {
    with_report(world, |report| {
        assert!(report.is_complete());
        assert_eq!(report.dataset.way_count(), report.tiles.len());
        assert!(
            report
                .dataset
                .ways()
                .all(|way| way.nodes.len() == 3 && way.id.is_local())
        );
    });
}

#[then("one tile failure is reported")]
fn one_failure(#[from(world)] world: &FetchWorld) {
    with_report(world, |report| {
        assert_eq!(report.failures.len(), 1);
        let failure = report.failures.first().expect("one failure");
        assert!(failure.tile.contains(Coord { x: 0.019, y: 0.009 }));
    });
}

#[then("the western half of the street is still merged")]
fn western_half_merged(#[from(world)] world: &FetchWorld) {
    with_report(world, |report| {
        assert_eq!(report.dataset.way_count(), 1);
        assert_eq!(report.dataset.node_count(), 3);
        assert!(!report.dataset.is_modified());
    });
}

#[scenario(
    path = "tests/features/tiled_fetch.feature",
    name = "splitting an oversized region"
)]
fn splitting_oversized_region(#[from(world)] world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/tiled_fetch.feature",
    name = "tolerating a failed tile"
)]
fn tolerating_failed_tile(#[from(world)] world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/tiled_fetch.feature",
    name = "fetching a small region in one request"
)]
fn fetching_small_region(#[from(world)] world: FetchWorld) {
    let _ = world;
}
