//! Removal of candidates that the reference data already contains.

use std::collections::BTreeSet;

use conflux_core::{Dataset, NodeId, ReferenceDataset, Tolerance, WayId};

use crate::ConflationError;

/// What [`AlreadyAddedRemover::remove`] deleted from the candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    /// Candidate ways whose geometry the reference already covers.
    pub ways: Vec<WayId>,
    /// Nodes of those ways that nothing else needed.
    pub nodes: Vec<NodeId>,
}

/// Drops candidate ways whose geometry already exists in the reference.
///
/// A way matches only when [`ReferenceDataset::contains_way_geometry`]
/// finds an existing way with the same vertex sequence, in either
/// direction. Every match is identified
/// before anything is deleted; the nodes of deleted ways are then removed in
/// one pass when no surviving candidate way references them and the
/// reference does not contain them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlreadyAddedRemover {
    tolerance: Tolerance,
}

impl AlreadyAddedRemover {
    /// Create a remover matching within `tolerance`.
    #[must_use]
    pub const fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Remove already-present ways and their orphaned nodes from
    /// `candidates`.
    ///
    /// # Errors
    ///
    /// Propagates [`ConflationError::Dataset`] from node removal.
    pub fn remove<R>(
        &self,
        candidates: &mut Dataset,
        reference: &R,
    ) -> Result<Removal, ConflationError>
    where
        R: ReferenceDataset + ?Sized,
    {
        let matched: Vec<WayId> = candidates
            .ways()
            .filter(|way| {
                candidates
                    .way_coords(way.id)
                    .is_some_and(|coords| reference.contains_way_geometry(&coords, &self.tolerance))
            })
            .map(|way| way.id)
            .collect();

        let mut touched = BTreeSet::new();
        for id in &matched {
            if let Some(way) = candidates.remove_way(*id) {
                log::debug!("candidate way {id} is already present");
                touched.extend(way.nodes);
            }
        }

        let mut nodes = Vec::new();
        for node in touched {
            if candidates.referrers(node).next().is_some() || reference.contains_node(node) {
                continue;
            }
            if candidates.remove_node(node)?.is_some() {
                nodes.push(node);
            }
        }
        Ok(Removal {
            ways: matched,
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_core::{IndexedReference, Node, Way};
    use geo::Coord;
    use rstest::{fixture, rstest};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn add_line(dataset: &mut Dataset, way: i64, nodes: &[(i64, Coord<f64>)]) {
        for (id, location) in nodes {
            if !dataset.contains_node(NodeId(*id)) {
                dataset
                    .add_node(Node::with_empty_tags(NodeId(*id), *location))
                    .expect("add node");
            }
        }
        dataset
            .add_way(Way::with_empty_tags(
                WayId(way),
                nodes.iter().map(|(id, _)| NodeId(*id)).collect(),
            ))
            .expect("add way");
    }

    /// Permanent street along the meridian.
    #[fixture]
    fn reference() -> Dataset {
        let mut dataset = Dataset::new();
        add_line(
            &mut dataset,
            1,
            &[(1, c(0.0, 0.0)), (2, c(0.0, 0.001)), (3, c(0.0, 0.002))],
        );
        dataset
    }

    /// Candidate copy of the street, vertex for vertex but reversed and
    /// about a metre east, plus a new side street sharing its southern node.
    #[fixture]
    fn candidates() -> Dataset {
        let mut dataset = Dataset::new();
        add_line(
            &mut dataset,
            -1,
            &[
                (-1, c(0.00001, 0.002)),
                (-4, c(0.00001, 0.001)),
                (-2, c(0.00001, 0.0)),
            ],
        );
        add_line(
            &mut dataset,
            -2,
            &[(-2, c(0.00001, 0.0)), (-3, c(0.001, 0.0))],
        );
        dataset.snapshot();
        dataset
    }

    #[rstest]
    fn removes_matched_way_and_keeps_shared_nodes(reference: Dataset, mut candidates: Dataset) {
        let removal = AlreadyAddedRemover::default()
            .remove(&mut candidates, &IndexedReference::new(&reference))
            .expect("remove");
        assert_eq!(removal.ways, vec![WayId(-1)]);
        assert_eq!(removal.nodes, vec![NodeId(-4), NodeId(-1)]);
        assert!(candidates.contains_way(WayId(-2)));
        assert!(candidates.contains_node(NodeId(-2)));
        assert_eq!(reference.way_count(), 1);
        assert_eq!(reference.node_count(), 3);
    }

    #[rstest]
    fn keeps_nodes_present_in_the_reference(reference: Dataset) {
        let mut candidates = Dataset::new();
        add_line(
            &mut candidates,
            -1,
            &[(1, c(0.0, 0.0)), (-5, c(0.0, 0.001)), (-6, c(0.0, 0.002))],
        );
        let removal = AlreadyAddedRemover::default()
            .remove(&mut candidates, &reference)
            .expect("remove");
        assert_eq!(removal.ways, vec![WayId(-1)]);
        assert_eq!(removal.nodes, vec![NodeId(-6), NodeId(-5)]);
        assert!(candidates.contains_node(NodeId(1)));
    }

    #[rstest]
    #[case::far_away(vec![(-1, c(0.01, 0.0)), (-2, c(0.011, 0.0))])]
    #[case::sub_span(vec![(-1, c(0.0, 0.0002)), (-2, c(0.0, 0.0008))])]
    #[case::missing_vertex(vec![(-1, c(0.0, 0.0)), (-2, c(0.0, 0.002))])]
    #[case::extra_vertex(vec![
        (-1, c(0.0, 0.0)),
        (-2, c(0.0, 0.0005)),
        (-3, c(0.0, 0.001)),
        (-4, c(0.0, 0.002)),
    ])]
    fn unmatched_candidates_survive(reference: Dataset, #[case] line: Vec<(i64, Coord<f64>)>) {
        let mut candidates = Dataset::new();
        add_line(&mut candidates, -1, &line);
        let removal = AlreadyAddedRemover::default()
            .remove(&mut candidates, &IndexedReference::new(&reference))
            .expect("remove");
        assert_eq!(removal, Removal::default());
        assert_eq!(candidates.way_count(), 1);
        assert_eq!(candidates.node_count(), line.len());
    }
}
