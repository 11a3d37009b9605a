//! Source features and their conversion into a [`Dataset`].

use std::collections::HashMap;

use geo::Coord;

use crate::{ConflationMarker, Dataset, DatasetError, Node, NodeId, Tags, Way, WayId};

/// Geometry of one source feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    /// A single position.
    Point(Coord<f64>),
    /// An open or closed polyline.
    LineString(Vec<Coord<f64>>),
    /// Several polylines sharing one set of tags.
    MultiLineString(Vec<Vec<Coord<f64>>>),
}

/// A tagged geometry delivered by a [`GeometrySource`](crate::GeometrySource).
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry.
    pub geometry: FeatureGeometry,
    /// Feature properties as tags. May carry encoded markers.
    pub tags: Tags,
}

impl Feature {
    /// Point feature.
    #[must_use]
    pub const fn point(location: Coord<f64>, tags: Tags) -> Self {
        Self {
            geometry: FeatureGeometry::Point(location),
            tags,
        }
    }

    /// Line feature.
    #[must_use]
    pub const fn line(coords: Vec<Coord<f64>>, tags: Tags) -> Self {
        Self {
            geometry: FeatureGeometry::LineString(coords),
            tags,
        }
    }
}

/// Which identifier range a [`DatasetBuilder`] allocates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentitySpace {
    /// Negative identifiers for candidate data.
    #[default]
    Local,
    /// Positive identifiers for reference data loaded from disk.
    Permanent,
}

/// Assembles features into a dataset.
///
/// Features at identical coordinates share a node, so a point feature placed
/// on a line's vertex tags that vertex instead of floating beside it.
/// Encoded markers are lifted out of point properties into the marker table;
/// malformed encodings are dropped with a warning and the feature is kept.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use conflux_core::{DatasetBuilder, Feature, IdentitySpace, Tags};
///
/// # fn main() -> Result<(), conflux_core::DatasetError> {
/// let mut builder = DatasetBuilder::new(IdentitySpace::Local);
/// let a = Coord { x: 0.0, y: 0.0 };
/// let b = Coord { x: 0.0, y: 0.001 };
/// builder.push(Feature::line(vec![a, b], Tags::new()))?;
/// builder.push(Feature::point(b, Tags::new()))?;
/// let dataset = builder.build();
/// assert_eq!(dataset.node_count(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    dataset: Dataset,
    space: IdentitySpace,
    vertices: HashMap<(u64, u64), NodeId>,
    last_permanent_node: i64,
    last_permanent_way: i64,
}

impl DatasetBuilder {
    /// Create a builder allocating identifiers from `space`.
    #[must_use]
    pub fn new(space: IdentitySpace) -> Self {
        Self {
            space,
            ..Self::default()
        }
    }

    /// Add every feature of `features`.
    ///
    /// # Errors
    ///
    /// Propagates [`DatasetError`] from the underlying dataset.
    pub fn extend(&mut self, features: impl IntoIterator<Item = Feature>) -> Result<(), DatasetError> {
        features.into_iter().try_for_each(|feature| self.push(feature))
    }

    /// Add one feature.
    ///
    /// # Errors
    ///
    /// Propagates [`DatasetError`] from the underlying dataset.
    pub fn push(&mut self, feature: Feature) -> Result<(), DatasetError> {
        let Feature { geometry, mut tags } = feature;
        match geometry {
            FeatureGeometry::Point(location) => {
                let marker = self.take_marker(&mut tags);
                let id = self.vertex(location);
                self.dataset.update_tags(id.into(), |existing| {
                    for (key, value) in tags {
                        existing.entry(key).or_insert(value);
                    }
                })?;
                if let Some(marker) = marker {
                    if let Err(err) = self.dataset.set_marker(id, marker) {
                        log::warn!("ignoring marker on {id}: {err}");
                    }
                }
                Ok(())
            }
            FeatureGeometry::LineString(coords) => {
                Self::strip_way_markers(&mut tags);
                self.push_line(coords, tags)
            }
            FeatureGeometry::MultiLineString(lines) => {
                Self::strip_way_markers(&mut tags);
                lines
                    .into_iter()
                    .try_for_each(|coords| self.push_line(coords, tags.clone()))
            }
        }
    }

    /// Finish building. The returned dataset reports no pending changes.
    #[must_use]
    pub fn build(mut self) -> Dataset {
        self.dataset.snapshot();
        self.dataset
    }

    fn push_line(&mut self, mut coords: Vec<Coord<f64>>, tags: Tags) -> Result<(), DatasetError> {
        coords.dedup();
        if coords.len() < 2 {
            log::debug!("skipping line feature with fewer than two distinct vertices");
            return Ok(());
        }
        let nodes = coords.into_iter().map(|c| self.vertex(c)).collect();
        let id = self.next_way_id();
        self.dataset.add_way(Way::new(id, nodes, tags))
    }

    fn vertex(&mut self, location: Coord<f64>) -> NodeId {
        let key = vertex_key(location);
        if let Some(id) = self.vertices.get(&key) {
            return *id;
        }
        let id = self.next_node_id();
        self.dataset
            .put_node(Node::with_empty_tags(id, location));
        self.vertices.insert(key, id);
        id
    }

    fn next_node_id(&mut self) -> NodeId {
        match self.space {
            IdentitySpace::Local => self.dataset.allocate_node_id(),
            IdentitySpace::Permanent => {
                self.last_permanent_node = self.last_permanent_node.saturating_add(1);
                NodeId(self.last_permanent_node)
            }
        }
    }

    fn next_way_id(&mut self) -> WayId {
        match self.space {
            IdentitySpace::Local => self.dataset.allocate_way_id(),
            IdentitySpace::Permanent => {
                self.last_permanent_way = self.last_permanent_way.saturating_add(1);
                WayId(self.last_permanent_way)
            }
        }
    }

    fn take_marker(&self, tags: &mut Tags) -> Option<ConflationMarker> {
        match ConflationMarker::take_from_tags(tags) {
            Ok(Some(marker)) if self.space == IdentitySpace::Permanent => {
                log::warn!("ignoring marker {marker} on reference data");
                None
            }
            Ok(marker) => marker,
            Err(err) => {
                log::warn!("skipping malformed marker: {err}");
                None
            }
        }
    }

    fn strip_way_markers(tags: &mut Tags) {
        match ConflationMarker::take_from_tags(tags) {
            Ok(None) => {}
            Ok(Some(marker)) => log::warn!("ignoring marker {marker} on a line feature"),
            Err(err) => log::warn!("ignoring malformed marker on a line feature: {err}"),
        }
    }
}

#[expect(clippy::float_arithmetic, reason = "folds negative zero into zero")]
fn vertex_key(location: Coord<f64>) -> (u64, u64) {
    ((location.x + 0.0).to_bits(), (location.y + 0.0).to_bits())
}
