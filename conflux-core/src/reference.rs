//! Read-only lookups against the data candidates are conflated with.
//!
//! [`ReferenceDataset`] abstracts the existing data. [`Dataset`] implements
//! it with linear scans, which suits small fixtures; [`IndexedReference`]
//! builds R\*-trees over nodes and segments for real workloads.

use std::collections::BTreeSet;

use geo::Coord;
use rstar::{AABB, RTree, RTreeObject};

use crate::geometry::{SegmentProjection, distance_m, project_onto_segment, radius_in_degrees};
use crate::{Dataset, NodeId, Tolerance, WayId};

/// One segment of a reference way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRef {
    /// Way owning the segment.
    pub way: WayId,
    /// Node at the segment start.
    pub first: NodeId,
    /// Node at the segment end.
    pub second: NodeId,
    /// Location of `first`.
    pub start: Coord<f64>,
    /// Location of `second`.
    pub end: Coord<f64>,
}

impl SegmentRef {
    /// Project `point` onto this segment.
    #[must_use]
    pub fn project(&self, point: Coord<f64>) -> SegmentProjection {
        project_onto_segment(point, self.start, self.end)
    }
}

/// A node found near a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyNode {
    /// Node identifier.
    pub id: NodeId,
    /// Node location.
    pub location: Coord<f64>,
    /// Distance from the query point in metres.
    pub distance_m: f64,
}

/// A segment found near a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbySegment {
    /// The segment.
    pub segment: SegmentRef,
    /// Projection of the query point onto the segment.
    pub projection: SegmentProjection,
}

/// Existing data that candidates are compared against.
pub trait ReferenceDataset {
    /// Return `true` when a node with this identifier exists.
    fn contains_node(&self, id: NodeId) -> bool;

    /// Location of a node, if it exists.
    fn node_location(&self, id: NodeId) -> Option<Coord<f64>>;

    /// Nodes within `radius_m` of `location`, nearest first.
    fn nodes_within(&self, location: Coord<f64>, radius_m: f64) -> Vec<NearbyNode>;

    /// Segments within `radius_m` of `location`, nearest first.
    fn segments_within(&self, location: Coord<f64>, radius_m: f64) -> Vec<NearbySegment>;

    /// Node locations of an existing way in order, if the way exists.
    fn way_coords(&self, id: WayId) -> Option<Vec<Coord<f64>>>;

    /// Return `true` when one existing way has the same shape as `geometry`.
    ///
    /// The way must have as many nodes as `geometry` has vertices, and each
    /// vertex must lie within the snapping distance of the matching node,
    /// walking the way forward or reversed. Partial overlaps never match.
    fn contains_way_geometry(&self, geometry: &[Coord<f64>], tolerance: &Tolerance) -> bool {
        let (Some(first), Some(last)) = (geometry.first(), geometry.last()) else {
            return false;
        };
        if geometry.len() < 2 {
            return false;
        }
        let snap = tolerance.snap_distance_m;
        let nearby: BTreeSet<WayId> = [*first, *last]
            .into_iter()
            .flat_map(|end| self.segments_within(end, snap))
            .map(|near| near.segment.way)
            .collect();
        nearby.into_iter().any(|way| {
            self.way_coords(way)
                .is_some_and(|coords| same_vertices(geometry, &coords, snap))
        })
    }
}

fn same_vertices(geometry: &[Coord<f64>], coords: &[Coord<f64>], snap_m: f64) -> bool {
    let within = |(a, b): (&Coord<f64>, &Coord<f64>)| distance_m(*a, *b) <= snap_m;
    geometry.len() == coords.len()
        && (geometry.iter().zip(coords).all(within)
            || geometry.iter().zip(coords.iter().rev()).all(within))
}

fn sort_nodes(mut nodes: Vec<NearbyNode>) -> Vec<NearbyNode> {
    nodes.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m).then(a.id.cmp(&b.id)));
    nodes
}

fn sort_segments(mut segments: Vec<NearbySegment>) -> Vec<NearbySegment> {
    segments.sort_by(|a, b| {
        a.projection
            .distance_m
            .total_cmp(&b.projection.distance_m)
            .then(a.segment.way.cmp(&b.segment.way))
            .then(a.segment.first.cmp(&b.segment.first))
    });
    segments
}

fn dataset_segments(dataset: &Dataset) -> impl Iterator<Item = SegmentRef> + '_ {
    dataset.ways().flat_map(move |way| {
        way.segments().filter_map(move |(first, second)| {
            Some(SegmentRef {
                way: way.id,
                first,
                second,
                start: dataset.node_location(first)?,
                end: dataset.node_location(second)?,
            })
        })
    })
}

impl ReferenceDataset for Dataset {
    fn contains_node(&self, id: NodeId) -> bool {
        Self::contains_node(self, id)
    }

    fn node_location(&self, id: NodeId) -> Option<Coord<f64>> {
        Self::node_location(self, id)
    }

    fn way_coords(&self, id: WayId) -> Option<Vec<Coord<f64>>> {
        Self::way_coords(self, id)
    }

    fn nodes_within(&self, location: Coord<f64>, radius_m: f64) -> Vec<NearbyNode> {
        sort_nodes(
            self.nodes()
                .map(|node| NearbyNode {
                    id: node.id,
                    location: node.location,
                    distance_m: distance_m(location, node.location),
                })
                .filter(|near| near.distance_m <= radius_m)
                .collect(),
        )
    }

    fn segments_within(&self, location: Coord<f64>, radius_m: f64) -> Vec<NearbySegment> {
        sort_segments(
            dataset_segments(self)
                .map(|segment| NearbySegment {
                    segment,
                    projection: segment.project(location),
                })
                .filter(|near| near.projection.distance_m <= radius_m)
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
struct IndexedNode {
    id: NodeId,
    location: Coord<f64>,
}

impl RTreeObject for IndexedNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.x, self.location.y])
    }
}

#[derive(Debug, Clone)]
struct IndexedSegment(SegmentRef);

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.0.start.x, self.0.start.y],
            [self.0.end.x, self.0.end.y],
        )
    }
}

/// A [`Dataset`] with R\*-tree indexes over its nodes and segments.
///
/// The indexes are built once; the dataset must not change while the
/// wrapper is alive, which the shared borrow enforces.
#[derive(Debug)]
pub struct IndexedReference<'a> {
    dataset: &'a Dataset,
    nodes: RTree<IndexedNode>,
    segments: RTree<IndexedSegment>,
}

impl<'a> IndexedReference<'a> {
    /// Index `dataset`.
    #[must_use]
    pub fn new(dataset: &'a Dataset) -> Self {
        let nodes = dataset
            .nodes()
            .map(|node| IndexedNode {
                id: node.id,
                location: node.location,
            })
            .collect();
        let segments = dataset_segments(dataset).map(IndexedSegment).collect();
        Self {
            dataset,
            nodes: RTree::bulk_load(nodes),
            segments: RTree::bulk_load(segments),
        }
    }

    /// The indexed dataset.
    #[must_use]
    pub const fn dataset(&self) -> &'a Dataset {
        self.dataset
    }
}

#[expect(clippy::float_arithmetic, reason = "search envelope around a point")]
fn search_envelope(location: Coord<f64>, radius_m: f64) -> AABB<[f64; 2]> {
    let (dlon, dlat) = radius_in_degrees(location, radius_m);
    AABB::from_corners(
        [location.x - dlon, location.y - dlat],
        [location.x + dlon, location.y + dlat],
    )
}

impl ReferenceDataset for IndexedReference<'_> {
    fn contains_node(&self, id: NodeId) -> bool {
        self.dataset.contains_node(id)
    }

    fn node_location(&self, id: NodeId) -> Option<Coord<f64>> {
        self.dataset.node_location(id)
    }

    fn way_coords(&self, id: WayId) -> Option<Vec<Coord<f64>>> {
        self.dataset.way_coords(id)
    }

    fn nodes_within(&self, location: Coord<f64>, radius_m: f64) -> Vec<NearbyNode> {
        let envelope = search_envelope(location, radius_m);
        sort_nodes(
            self.nodes
                .locate_in_envelope_intersecting(&envelope)
                .map(|node| NearbyNode {
                    id: node.id,
                    location: node.location,
                    distance_m: distance_m(location, node.location),
                })
                .filter(|near| near.distance_m <= radius_m)
                .collect(),
        )
    }

    fn segments_within(&self, location: Coord<f64>, radius_m: f64) -> Vec<NearbySegment> {
        let envelope = search_envelope(location, radius_m);
        sort_segments(
            self.segments
                .locate_in_envelope_intersecting(&envelope)
                .map(|indexed| NearbySegment {
                    segment: indexed.0,
                    projection: indexed.0.project(location),
                })
                .filter(|near| near.projection.distance_m <= radius_m)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, Way};
    use rstest::{fixture, rstest};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    /// A north-south street of three nodes near the equator.
    #[fixture]
    fn street() -> Dataset {
        let mut dataset = Dataset::new();
        for (id, y) in [(1, 0.0), (2, 0.001), (3, 0.002)] {
            dataset
                .add_node(Node::with_empty_tags(NodeId(id), c(0.0, y)))
                .expect("add node");
        }
        dataset
            .add_way(Way::with_empty_tags(
                WayId(10),
                vec![NodeId(1), NodeId(2), NodeId(3)],
            ))
            .expect("add way");
        dataset
    }

    #[rstest]
    fn linear_and_indexed_lookups_agree(street: Dataset) {
        let indexed = IndexedReference::new(&street);
        let probe = c(0.00002, 0.0011);
        assert_eq!(street.nodes_within(probe, 20.0), indexed.nodes_within(probe, 20.0));
        assert_eq!(
            ReferenceDataset::node_location(&indexed, NodeId(2)),
            Some(c(0.0, 0.001))
        );
        assert_eq!(
            street.segments_within(probe, 5.0),
            indexed.segments_within(probe, 5.0)
        );
        let nearest = indexed
            .segments_within(probe, 5.0)
            .into_iter()
            .next()
            .expect("segment near probe");
        assert_eq!(nearest.segment.first, NodeId(2));
        assert!(nearest.projection.is_interior());
    }

    #[rstest]
    #[case::offset_copy(vec![c(0.00001, 0.0), c(0.00001, 0.001), c(0.00001, 0.002)], true)]
    #[case::reversed_copy(vec![c(0.00001, 0.002), c(0.0, 0.001), c(-0.00001, 0.0)], true)]
    #[case::sub_span(vec![c(0.0, 0.0002), c(0.0, 0.0008)], false)]
    #[case::end_to_end_without_middle(vec![c(0.0, 0.0), c(0.0, 0.002)], false)]
    #[case::extra_vertex(
        vec![c(0.0, 0.0), c(0.0, 0.001), c(0.0, 0.002), c(0.0, 0.0025)],
        false
    )]
    #[case::middle_vertex_displaced(vec![c(0.0, 0.0), c(0.0003, 0.001), c(0.0, 0.002)], false)]
    #[case::parallel_street(vec![c(0.001, 0.0), c(0.001, 0.001), c(0.001, 0.002)], false)]
    #[case::single_point(vec![c(0.0, 0.0005)], false)]
    fn detects_geometry_already_present(
        street: Dataset,
        #[case] geometry: Vec<Coord<f64>>,
        #[case] expected: bool,
    ) {
        let indexed = IndexedReference::new(&street);
        let tolerance = Tolerance::default();
        assert_eq!(indexed.contains_way_geometry(&geometry, &tolerance), expected);
        assert_eq!(street.contains_way_geometry(&geometry, &tolerance), expected);
    }
}
