//! Marking how candidate way ends join the reference data.

use std::collections::BTreeSet;

use conflux_core::{ConflationMarker, Dataset, NodeId, ReferenceDataset, Tolerance};
use geo::Coord;

use crate::ConflationError;

/// Attaches conflation markers to the end nodes of candidate ways.
///
/// An end node within the snapping distance of a reference node becomes a
/// duplicate of the nearest such node. Otherwise, if it lies within the
/// snapping distance of the interior of a reference segment, it is marked to
/// connect into the nearest such segment. End nodes that already carry a
/// marker, and permanent nodes, are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerAnnotator {
    tolerance: Tolerance,
}

impl MarkerAnnotator {
    /// Create an annotator matching within `tolerance`.
    #[must_use]
    pub const fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Marker for a candidate `node` at `location`, if the reference offers
    /// a node or segment to join.
    #[must_use]
    pub fn marker_for<R>(
        &self,
        reference: &R,
        node: NodeId,
        location: Coord<f64>,
    ) -> Option<ConflationMarker>
    where
        R: ReferenceDataset + ?Sized,
    {
        let radius = self.tolerance.snap_distance_m;
        if let Some(nearest) = reference
            .nodes_within(location, radius)
            .into_iter()
            .find(|near| near.id != node)
        {
            return Some(ConflationMarker::Duplicate {
                canonical: nearest.id,
            });
        }
        reference
            .segments_within(location, radius)
            .into_iter()
            .find(|near| near.projection.is_interior())
            .map(|near| ConflationMarker::Connect {
                way: near.segment.way,
                first: near.segment.first,
                second: near.segment.second,
            })
    }

    /// Annotate every unmarked local end node in `candidates`.
    ///
    /// Returns the number of markers added.
    ///
    /// # Errors
    ///
    /// Propagates [`ConflationError::Dataset`] from the marker table.
    pub fn annotate<R>(
        &self,
        candidates: &mut Dataset,
        reference: &R,
    ) -> Result<usize, ConflationError>
    where
        R: ReferenceDataset + ?Sized,
    {
        let ends: BTreeSet<NodeId> = candidates
            .ways()
            .flat_map(|way| way.first_node().into_iter().chain(way.last_node()))
            .filter(|node| node.is_local() && candidates.marker(*node).is_none())
            .collect();

        let mut added = 0;
        for node in ends {
            let Some(location) = candidates.node_location(node) else {
                continue;
            };
            let Some(marker) = self.marker_for(reference, node, location) else {
                continue;
            };
            log::debug!("marking {node} with {marker}");
            candidates.set_marker(node, marker)?;
            added += 1;
        }
        Ok(added)
    }
}
