//! Tiled, concurrent fetching of candidate geometry.
//!
//! [`TiledFetchOrchestrator`] bisects an oversized query region into tiles no
//! longer than a configured side, fetches each tile from a
//! [`GeometrySource`](conflux_core::GeometrySource) on a bounded worker pool,
//! and unions the per-tile datasets into one working dataset. Duplicate
//! geometry where tiles overlap is left for the conflation engine.
//!
//! [`http::HttpGeometrySource`] is a source backed by a GeoJSON tile service.
#![forbid(unsafe_code)]

pub mod http;
mod orchestrator;
mod tiles;

pub use orchestrator::{
    DEFAULT_MAX_TILE_SIDE_M, DEFAULT_MAX_WORKERS, FetchConfig, FetchReport, TileFailure,
    TiledFetchOrchestrator,
};
pub use tiles::{MIN_TILE_SIDE_M, plan_tiles};
