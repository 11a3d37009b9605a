//! Concurrent fetching of planned tiles and merging of their datasets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use conflux_core::{
    BoundingBox, Dataset, DatasetBuilder, GeometrySource, IdentitySpace, SourceError,
};

use crate::tiles::plan_tiles;

/// Default upper bound on a tile's longer side, in metres.
pub const DEFAULT_MAX_TILE_SIDE_M: f64 = 10_000.0;

/// Default number of tiles fetched at once.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Tiling and concurrency settings for [`TiledFetchOrchestrator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchConfig {
    /// Longest permitted tile side in metres.
    pub max_tile_side_m: f64,
    /// Maximum number of tiles in flight. Zero is treated as one.
    pub max_workers: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_tile_side_m: DEFAULT_MAX_TILE_SIDE_M,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl FetchConfig {
    /// Set the longest permitted tile side.
    #[must_use]
    pub const fn with_max_tile_side_m(mut self, metres: f64) -> Self {
        self.max_tile_side_m = metres;
        self
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }
}

/// A tile whose fetch failed and contributed nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFailure {
    /// Position of the tile in [`FetchReport::tiles`].
    pub index: usize,
    /// The tile.
    pub tile: BoundingBox,
    /// Why it failed.
    pub error: SourceError,
}

/// Outcome of one tiled fetch.
#[derive(Debug)]
pub struct FetchReport {
    /// Union of every successful tile, with fresh local identifiers.
    pub dataset: Dataset,
    /// Planned tiles in merge order.
    pub tiles: Vec<BoundingBox>,
    /// Tiles that failed.
    pub failures: Vec<TileFailure>,
}

impl FetchReport {
    /// Return `true` when every tile was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Splits a region into tiles, fetches them concurrently, and merges them.
///
/// Each tile builds its own dataset from the features it receives, so
/// workers share nothing but the source. Tiles are merged in plan order once
/// every worker has finished, which makes the identifiers of the merged
/// dataset independent of scheduling. A failed tile is logged and skipped.
///
/// # Examples
///
/// ```
/// use conflux_core::{BoundingBox, Feature, GeometrySource, SourceError};
/// use conflux_fetch::{FetchConfig, TiledFetchOrchestrator};
///
/// struct Empty;
///
/// impl GeometrySource for Empty {
///     fn fetch(&self, _bbox: &BoundingBox) -> Result<Vec<Feature>, SourceError> {
///         Ok(Vec::new())
///     }
/// }
///
/// # fn main() -> Result<(), conflux_core::BoundingBoxError> {
/// let orchestrator = TiledFetchOrchestrator::with_config(
///     Empty,
///     FetchConfig::default().with_max_tile_side_m(500.0),
/// );
/// let report = orchestrator.fetch(&BoundingBox::new(0.0, 0.0, 0.01, 0.01)?);
/// assert!(report.is_complete());
/// assert!(report.tiles.len() > 1);
/// assert!(report.dataset.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TiledFetchOrchestrator<S> {
    source: S,
    config: FetchConfig,
}

impl<S: GeometrySource> TiledFetchOrchestrator<S> {
    /// Create an orchestrator with the default [`FetchConfig`].
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_config(source, FetchConfig::default())
    }

    /// Create an orchestrator with explicit settings.
    #[must_use]
    pub const fn with_config(source: S, config: FetchConfig) -> Self {
        Self { source, config }
    }

    /// Active settings.
    #[must_use]
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// The wrapped source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Fetch `region` and merge the tiles into one dataset.
    ///
    /// The merged dataset reports no pending changes.
    #[must_use]
    pub fn fetch(&self, region: &BoundingBox) -> FetchReport {
        let tiles = plan_tiles(region, self.config.max_tile_side_m);
        log::info!(
            "fetching {region} as {} tile(s) with up to {} worker(s)",
            tiles.len(),
            self.config.max_workers.max(1)
        );
        let mut outcomes = self.fetch_all(&tiles);
        outcomes.sort_by_key(|(index, _)| *index);

        let mut dataset = Dataset::new();
        let mut failures = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(leaf) => {
                    dataset.absorb(leaf);
                }
                Err(error) => {
                    let Some(tile) = tiles.get(index).copied() else {
                        continue;
                    };
                    log::warn!("tile {index} ({tile}) contributed nothing: {error}");
                    failures.push(TileFailure { index, tile, error });
                }
            }
        }
        dataset.snapshot();
        log::info!(
            "merged {} node(s) and {} way(s); {} tile(s) failed",
            dataset.node_count(),
            dataset.way_count(),
            failures.len()
        );
        FetchReport {
            dataset,
            tiles,
            failures,
        }
    }

    fn fetch_all(&self, tiles: &[BoundingBox]) -> Vec<(usize, Result<Dataset, SourceError>)> {
        let workers = self.config.max_workers.max(1).min(tiles.len());
        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(tile) = tiles.get(index) else {
                            break;
                        };
                        if tx.send((index, self.fetch_tile(tile))).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx);
        rx.into_iter().collect()
    }

    fn fetch_tile(&self, tile: &BoundingBox) -> Result<Dataset, SourceError> {
        let features = self.source.fetch(tile)?;
        log::debug!("tile {tile} returned {} feature(s)", features.len());
        let mut builder = DatasetBuilder::new(IdentitySpace::Local);
        builder
            .extend(features)
            .map_err(|err| SourceError::Parse {
                message: err.to_string(),
            })?;
        Ok(builder.build())
    }
}
