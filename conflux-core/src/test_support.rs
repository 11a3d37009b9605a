//! In-memory `GeometrySource` implementations used by unit and
//! behaviour tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use geo::Coord;

use crate::{BoundingBox, Feature, FeatureGeometry, GeometrySource, SourceError};

/// In-memory `GeometrySource` serving a fixed feature list.
///
/// A feature is returned for every tile it touches, so lines crossing tile
/// boundaries arrive more than once, as they do from real tile services.
#[derive(Debug, Default)]
pub struct StaticGeometrySource {
    features: Vec<Feature>,
    failing: Vec<Coord<f64>>,
    requests: AtomicUsize,
}

impl StaticGeometrySource {
    /// Create a source serving `features`.
    #[must_use]
    pub fn with_features<I>(features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        Self {
            features: features.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Fail every request whose bounding box contains `location`.
    #[must_use]
    pub fn failing_at(mut self, location: Coord<f64>) -> Self {
        self.failing.push(location);
        self
    }

    /// Number of requests served so far, including failures.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn touches(bbox: &BoundingBox, feature: &Feature) -> bool {
        match &feature.geometry {
            FeatureGeometry::Point(location) => bbox.contains(*location),
            FeatureGeometry::LineString(coords) => coords.iter().any(|c| bbox.contains(*c)),
            FeatureGeometry::MultiLineString(lines) => {
                lines.iter().flatten().any(|c| bbox.contains(*c))
            }
        }
    }
}

impl GeometrySource for StaticGeometrySource {
    fn fetch(&self, bbox: &BoundingBox) -> Result<Vec<Feature>, SourceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|location| bbox.contains(*location)) {
            return Err(SourceError::Unavailable {
                message: format!("tile {bbox} is configured to fail"),
            });
        }
        Ok(self
            .features
            .iter()
            .filter(|feature| Self::touches(bbox, feature))
            .cloned()
            .collect())
    }
}

/// `GeometrySource` that fails every request with a fixed error.
#[derive(Debug, Clone)]
pub struct FailingGeometrySource {
    error: SourceError,
}

impl FailingGeometrySource {
    /// Fail every request with `error`.
    #[must_use]
    pub const fn new(error: SourceError) -> Self {
        Self { error }
    }
}

impl GeometrySource for FailingGeometrySource {
    fn fetch(&self, _bbox: &BoundingBox) -> Result<Vec<Feature>, SourceError> {
        Err(self.error.clone())
    }
}
