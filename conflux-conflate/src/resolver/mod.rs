//! Topology repair between overlapping candidate ways.
//!
//! Two segments *match* when each endpoint of one lies within the snapping
//! distance of an endpoint of the other and their directions agree within
//! the collinearity angle. Matching segments describe the same stretch of
//! road, so their distinct endpoints are unified onto one node.
//!
//! A node of one way that lies strictly inside a segment of the other way,
//! away from that way's nodes, and whose own adjacent segment runs along
//! that segment, is *missing* from the other way and is spliced in at its
//! projection parameter.
//!
//! Both directions are computed from the geometry as it was before the pair
//! was touched and applied together, so `(a, b)` and `(b, a)` produce the
//! same shared-node topology.

use std::collections::{BTreeMap, BTreeSet};

use conflux_core::geometry::{distance_m, project_onto_segment, radius_in_degrees, undirected_angle_deg};
use conflux_core::{Dataset, NodeId, Tolerance, WayId};
use geo::Coord;
use rstar::{AABB, RTree, RTreeObject};

use crate::{ConflationError, merge_tags, node_rank};

/// Counts reported by [`DuplicateSegmentResolver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    /// Node references spliced into ways.
    pub inserted: usize,
    /// Nodes merged into a coincident survivor.
    pub unified: usize,
    /// Ways deleted because unification collapsed them to a single node.
    pub collapsed: usize,
}

impl Resolution {
    /// Add the counts of `other`.
    pub const fn accumulate(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.unified += other.unified;
        self.collapsed += other.collapsed;
    }
}

type Vertex = (NodeId, Coord<f64>);

#[derive(Debug)]
struct Polyline {
    vertices: Vec<Vertex>,
}

impl Polyline {
    fn load(dataset: &Dataset, id: WayId) -> Result<Self, ConflationError> {
        let way = dataset.way(id).ok_or(ConflationError::UnknownWay(id))?;
        let vertices = way
            .nodes
            .iter()
            .filter_map(|node| Some((*node, dataset.node_location(*node)?)))
            .collect();
        Ok(Self { vertices })
    }

    fn segments(&self) -> impl Iterator<Item = (usize, Vertex, Vertex)> + '_ {
        self.vertices
            .windows(2)
            .enumerate()
            .filter_map(|(index, pair)| match pair {
                [start, end] => Some((index, *start, *end)),
                _ => None,
            })
    }

    fn contains(&self, id: NodeId) -> bool {
        self.vertices.iter().any(|(node, _)| *node == id)
    }

    fn neighbours(&self, index: usize) -> impl Iterator<Item = Coord<f64>> + '_ {
        let previous = index.checked_sub(1).and_then(|i| self.vertices.get(i));
        let next = self.vertices.get(index + 1);
        previous.into_iter().chain(next).map(|(_, location)| *location)
    }
}

/// A node to splice into segment `segment` of a target way.
#[derive(Debug, Clone, Copy)]
struct Insertion {
    segment: usize,
    parameter: f64,
    node: NodeId,
}

/// Splices missing nodes into overlapping ways and unifies coincident
/// endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateSegmentResolver {
    tolerance: Tolerance,
}

impl DuplicateSegmentResolver {
    /// Create a resolver matching within `tolerance`.
    #[must_use]
    pub const fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Resolve one pair of ways.
    ///
    /// # Errors
    ///
    /// Returns [`ConflationError::UnknownWay`] when either way is missing and
    /// [`ConflationError::Dataset`] when an edit is rejected.
    pub fn resolve_pair(
        &self,
        dataset: &mut Dataset,
        first: WayId,
        second: WayId,
    ) -> Result<Resolution, ConflationError> {
        let a = Polyline::load(dataset, first)?;
        let b = Polyline::load(dataset, second)?;
        if first == second {
            return Ok(Resolution::default());
        }

        let into_a = self.missing_elements(&a, &b);
        let into_b = self.missing_elements(&b, &a);
        let replacements = self.coincident_endpoints(&a, &b);

        let mut resolution = Resolution {
            inserted: into_a.len() + into_b.len(),
            ..Resolution::default()
        };
        splice(dataset, first, &a, into_a)?;
        splice(dataset, second, &b, into_b)?;
        let (unified, collapsed) = unify(dataset, &replacements)?;
        resolution.unified = unified;
        resolution.collapsed = collapsed;
        if resolution != Resolution::default() {
            log::debug!("resolved ways {first} and {second}: {resolution:?}");
        }
        Ok(resolution)
    }

    /// Resolve every pair of ways whose envelopes come within the snapping
    /// distance of each other.
    ///
    /// Pairs are visited in identifier order; ways deleted by an earlier
    /// pair are skipped.
    ///
    /// # Errors
    ///
    /// Propagates [`ConflationError::Dataset`] from the edits.
    pub fn resolve_all(&self, dataset: &mut Dataset) -> Result<Resolution, ConflationError> {
        let index = RTree::bulk_load(
            dataset
                .ways()
                .filter_map(|way| self.way_envelope(dataset, way.id))
                .collect(),
        );
        let mut pairs = BTreeSet::new();
        for item in index.iter() {
            for other in index.locate_in_envelope_intersecting(&item.envelope) {
                if other.id > item.id {
                    pairs.insert((item.id, other.id));
                }
            }
        }

        let mut total = Resolution::default();
        for (first, second) in pairs {
            if dataset.contains_way(first) && dataset.contains_way(second) {
                total.accumulate(self.resolve_pair(dataset, first, second)?);
            }
        }
        Ok(total)
    }

    #[expect(clippy::float_arithmetic, reason = "padding an envelope by the snap radius")]
    fn way_envelope(&self, dataset: &Dataset, id: WayId) -> Option<WayEnvelope> {
        let coords = dataset.way_coords(id)?;
        let first = coords.first()?;
        let (mut min, mut max) = (*first, *first);
        for coord in &coords {
            min.x = min.x.min(coord.x);
            min.y = min.y.min(coord.y);
            max.x = max.x.max(coord.x);
            max.y = max.y.max(coord.y);
        }
        let widest = if min.y.abs() > max.y.abs() { min } else { max };
        let (dlon, dlat) = radius_in_degrees(widest, self.tolerance.snap_distance_m);
        Some(WayEnvelope {
            id,
            envelope: AABB::from_corners([min.x - dlon, min.y - dlat], [max.x + dlon, max.y + dlat]),
        })
    }

    fn missing_elements(&self, target: &Polyline, other: &Polyline) -> Vec<Insertion> {
        let mut found: BTreeMap<NodeId, (f64, Insertion)> = BTreeMap::new();
        for (index, (node, location)) in other.vertices.iter().enumerate() {
            if target.contains(*node) || found.contains_key(node) {
                continue;
            }
            let near_vertex = target
                .vertices
                .iter()
                .any(|(_, existing)| self.tolerance.snaps(distance_m(*existing, *location)));
            if near_vertex {
                continue;
            }
            for (segment, (_, start), (_, end)) in target.segments() {
                let projection = project_onto_segment(*location, start, end);
                if !projection.is_interior() || !self.tolerance.snaps(projection.distance_m) {
                    continue;
                }
                let runs_along = other.neighbours(index).any(|neighbour| {
                    self.tolerance
                        .aligned(undirected_angle_deg((neighbour, *location), (start, end)))
                });
                if !runs_along {
                    continue;
                }
                let better = found
                    .get(node)
                    .is_none_or(|(distance, _)| projection.distance_m < *distance);
                if better {
                    found.insert(
                        *node,
                        (
                            projection.distance_m,
                            Insertion {
                                segment,
                                parameter: projection.parameter,
                                node: *node,
                            },
                        ),
                    );
                }
            }
        }
        found.into_values().map(|(_, insertion)| insertion).collect()
    }

    fn coincident_endpoints(&self, a: &Polyline, b: &Polyline) -> BTreeMap<NodeId, NodeId> {
        let mut parent: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for (_, a_start, a_end) in a.segments() {
            for (_, b_start, b_end) in b.segments() {
                let Some(pairs) = self.matching_endpoints((a_start, a_end), (b_start, b_end))
                else {
                    continue;
                };
                for (x, y) in pairs {
                    let (root_x, root_y) = (find(&parent, x), find(&parent, y));
                    if root_x == root_y {
                        continue;
                    }
                    let (keep, merge) = if node_rank(root_x) <= node_rank(root_y) {
                        (root_x, root_y)
                    } else {
                        (root_y, root_x)
                    };
                    parent.insert(merge, keep);
                }
            }
        }
        parent
            .keys()
            .map(|victim| (*victim, find(&parent, *victim)))
            .collect()
    }

    fn matching_endpoints(
        &self,
        a: (Vertex, Vertex),
        b: (Vertex, Vertex),
    ) -> Option<[(NodeId, NodeId); 2]> {
        let snaps = |p: Vertex, q: Vertex| self.tolerance.snaps(distance_m(p.1, q.1));
        let pairs = if snaps(a.0, b.0) && snaps(a.1, b.1) {
            [(a.0.0, b.0.0), (a.1.0, b.1.0)]
        } else if snaps(a.0, b.1) && snaps(a.1, b.0) {
            [(a.0.0, b.1.0), (a.1.0, b.0.0)]
        } else {
            return None;
        };
        self.tolerance
            .aligned(undirected_angle_deg((a.0.1, a.1.1), (b.0.1, b.1.1)))
            .then_some(pairs)
    }
}

fn find(parent: &BTreeMap<NodeId, NodeId>, id: NodeId) -> NodeId {
    let mut current = id;
    while let Some(next) = parent.get(&current) {
        if *next == current {
            break;
        }
        current = *next;
    }
    current
}

fn splice(
    dataset: &mut Dataset,
    way: WayId,
    before: &Polyline,
    mut insertions: Vec<Insertion>,
) -> Result<(), ConflationError> {
    if insertions.is_empty() {
        return Ok(());
    }
    insertions.sort_by(|x, y| {
        x.segment
            .cmp(&y.segment)
            .then(x.parameter.total_cmp(&y.parameter))
            .then(x.node.cmp(&y.node))
    });
    let mut pending = insertions.into_iter().peekable();
    let mut nodes = Vec::with_capacity(before.vertices.len());
    for (index, (node, _)) in before.vertices.iter().enumerate() {
        nodes.push(*node);
        while let Some(insertion) = pending.next_if(|insertion| insertion.segment == index) {
            log::debug!("splicing node {} into way {way}", insertion.node);
            nodes.push(insertion.node);
        }
    }
    dataset.set_way_nodes(way, nodes)?;
    Ok(())
}

fn unify(
    dataset: &mut Dataset,
    replacements: &BTreeMap<NodeId, NodeId>,
) -> Result<(usize, usize), ConflationError> {
    let (mut unified, mut collapsed) = (0, 0);
    for (victim, survivor) in replacements {
        let (victim, survivor) = (*victim, *survivor);
        if victim == survivor || !dataset.contains_node(survivor) {
            continue;
        }
        let Some(tags) = dataset.node(victim).map(|node| node.tags.clone()) else {
            continue;
        };
        let referrers: Vec<WayId> = dataset.referrers(victim).collect();
        for way in referrers {
            let Some(current) = dataset.way(way) else {
                continue;
            };
            let mut nodes: Vec<NodeId> = current
                .nodes
                .iter()
                .map(|node| if *node == victim { survivor } else { *node })
                .collect();
            nodes.dedup();
            if nodes.len() < 2 {
                log::debug!("way {way} collapsed onto node {survivor}");
                dataset.remove_way(way);
                collapsed += 1;
            } else {
                dataset.set_way_nodes(way, nodes)?;
            }
        }
        dataset.update_tags(survivor.into(), |existing| merge_tags(existing, tags))?;
        if let Some(marker) = dataset.marker(victim).copied() {
            if survivor.is_local() && dataset.marker(survivor).is_none() {
                dataset.set_marker(survivor, marker)?;
            }
        }
        dataset.remove_node(victim)?;
        log::debug!("unified node {victim} into {survivor}");
        unified += 1;
    }
    Ok((unified, collapsed))
}

#[derive(Debug, Clone)]
struct WayEnvelope {
    id: WayId,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for WayEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}
