//! Splicing a candidate node into an existing edge.

use conflux_core::geometry::project_onto_segment;
use conflux_core::{ChangeSet, ConflationMarker, Dataset, NodeId, Slot, Tolerance, Way, WayId};

use crate::{CommandError, EditLog, RestoreSummary, ReversibleCommand};

/// Inserts a candidate node into a way between two anchor nodes and
/// consumes the candidate's `Connect` marker.
///
/// Construction re-checks that the candidate still lies within the snapping
/// distance of the anchor segment, since the anchors may have moved after
/// the marker was written.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use conflux_commands::{ConnectedCommand, ReversibleCommand};
/// use conflux_core::{ConflationMarker, Dataset, Node, NodeId, Tolerance, Way, WayId};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut dataset = Dataset::new();
/// dataset.add_node(Node::with_empty_tags(NodeId(1), Coord { x: 0.0, y: 0.0 }))?;
/// dataset.add_node(Node::with_empty_tags(NodeId(2), Coord { x: 1.0, y: 0.0 }))?;
/// dataset.add_node(Node::with_empty_tags(NodeId(-3), Coord { x: 0.5, y: 0.0 }))?;
/// dataset.add_way(Way::with_empty_tags(WayId(1), vec![NodeId(1), NodeId(2)]))?;
/// dataset.set_marker(
///     NodeId(-3),
///     ConflationMarker::Connect { way: WayId(1), first: NodeId(1), second: NodeId(2) },
/// )?;
///
/// let mut command = ConnectedCommand::new(&dataset, NodeId(-3), &Tolerance::default())
///     .ok_or("candidate should connect")?;
/// command.execute(&mut dataset)?;
/// assert_eq!(
///     dataset.way(WayId(1)).map(|way| way.nodes.clone()),
///     Some(vec![NodeId(1), NodeId(-3), NodeId(2)])
/// );
/// assert!(dataset.marker(NodeId(-3)).is_none());
///
/// command.undo(&mut dataset)?;
/// assert!(dataset.marker(NodeId(-3)).is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnectedCommand {
    candidate: NodeId,
    way: WayId,
    first: NodeId,
    second: NodeId,
    log: EditLog,
    executed: bool,
}

impl ConnectedCommand {
    /// Build the command from the `Connect` marker on `candidate`.
    ///
    /// Returns `None` when the candidate has no such marker or the marker
    /// no longer describes a valid splice.
    #[must_use]
    pub fn new(dataset: &Dataset, candidate: NodeId, tolerance: &Tolerance) -> Option<Self> {
        let ConflationMarker::Connect { way, first, second } = *dataset.marker(candidate)? else {
            return None;
        };
        Self::for_anchors(dataset, candidate, way, (first, second), tolerance)
    }

    /// Build a command splicing `candidate` into `way` between `anchors`.
    ///
    /// Returns `None` unless the way contains both anchors but not the
    /// candidate, and the candidate lies within the snapping distance of
    /// the segment joining the anchors.
    #[must_use]
    pub fn for_anchors(
        dataset: &Dataset,
        candidate: NodeId,
        way: WayId,
        anchors: (NodeId, NodeId),
        tolerance: &Tolerance,
    ) -> Option<Self> {
        let (first, second) = anchors;
        let location = dataset.node_location(candidate)?;
        let target = dataset.way(way)?;
        if first == second
            || target.contains(candidate)
            || !target.contains(first)
            || !target.contains(second)
        {
            return None;
        }
        let projection = project_onto_segment(
            location,
            dataset.node_location(first)?,
            dataset.node_location(second)?,
        );
        if !tolerance.snaps(projection.distance_m) {
            log::debug!(
                "{candidate} is {:.1} m from {first}-{second} on {way}, not connecting",
                projection.distance_m
            );
            return None;
        }
        Some(Self {
            candidate,
            way,
            first,
            second,
            log: EditLog::default(),
            executed: false,
        })
    }

    /// Node being spliced.
    #[must_use]
    pub const fn candidate(&self) -> NodeId {
        self.candidate
    }

    /// Way receiving the candidate.
    #[must_use]
    pub const fn way(&self) -> WayId {
        self.way
    }

    /// The way with the candidate inserted, or `None` when the splice is no
    /// longer possible.
    fn spliced(&self, dataset: &Dataset) -> Option<Way> {
        let way = dataset.way(self.way)?;
        if way.contains(self.candidate) {
            return None;
        }
        let at = adjacent_index(&way.nodes, self.first, self.second)
            .map(|index| index.saturating_add(1))
            .or_else(|| self.split_edge_index(dataset, way))?;
        let mut spliced = way.clone();
        spliced.nodes.insert(at, self.candidate);
        Some(spliced)
    }

    /// Insertion index when earlier splices already put nodes between the
    /// anchors. Nodes are kept ordered by their projection along the
    /// original anchor segment.
    fn split_edge_index(&self, dataset: &Dataset, way: &Way) -> Option<usize> {
        let first_at = way.nodes.iter().position(|node| *node == self.first)?;
        let second_at = way.nodes.iter().position(|node| *node == self.second)?;
        let low = first_at.min(second_at);
        let high = first_at.max(second_at);
        let start = dataset.node_location(*way.nodes.get(low)?)?;
        let end = dataset.node_location(*way.nodes.get(high)?)?;
        let location = dataset.node_location(self.candidate)?;
        let target = project_onto_segment(location, start, end).parameter;
        let between = way.nodes.get(low.saturating_add(1)..high)?;
        let preceding = between
            .iter()
            .take_while(|node| {
                dataset
                    .node_location(**node)
                    .is_some_and(|at| project_onto_segment(at, start, end).parameter <= target)
            })
            .count();
        Some(low.saturating_add(1).saturating_add(preceding))
    }
}

fn adjacent_index(nodes: &[NodeId], first: NodeId, second: NodeId) -> Option<usize> {
    nodes.windows(2).position(|pair| {
        matches!(pair, [a, b] if (*a == first && *b == second) || (*a == second && *b == first))
    })
}

impl ReversibleCommand for ConnectedCommand {
    fn execute(&mut self, dataset: &mut Dataset) -> Result<(), CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        let Some(spliced) = self.spliced(dataset) else {
            log::warn!(
                "{} can no longer be connected into {}, leaving it as is",
                self.candidate,
                self.way
            );
            self.log = EditLog::default();
            self.executed = true;
            return Ok(());
        };
        let candidate = self.candidate;
        self.log = EditLog::record(dataset, |edits, target| {
            edits.apply(target, Slot::way(spliced))?;
            edits.apply(target, Slot::Marker(candidate, None))
        })?;
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, dataset: &mut Dataset) -> Result<RestoreSummary, CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        let summary = self.log.revert(dataset);
        self.executed = false;
        Ok(summary)
    }

    fn change_set(&self) -> ChangeSet {
        self.log.change_set()
    }

    fn description(&self) -> String {
        format!(
            "connect {} into {} between {} and {}",
            self.candidate, self.way, self.first, self.second
        )
    }
}
