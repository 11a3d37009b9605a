//! Folding a candidate node into an existing node.

use conflux_core::geometry::distance_m;
use conflux_core::{ChangeSet, ConflationMarker, Dataset, NodeId, Slot, Tolerance, Way};

use crate::{CommandError, EditLog, RestoreSummary, ReversibleCommand};

/// Replaces a candidate node with its canonical twin and consumes the
/// candidate's `Duplicate` marker.
///
/// Every way referencing the candidate is rewritten to reference the
/// canonical node instead. The candidate's tags are merged onto the
/// canonical node without overwriting any value already there. The
/// candidate is then deleted and reported as merged, not deleted.
#[derive(Debug, Clone)]
pub struct DuplicateCommand {
    candidate: NodeId,
    canonical: NodeId,
    log: EditLog,
    executed: bool,
}

impl DuplicateCommand {
    /// Build the command from the `Duplicate` marker on `candidate`.
    ///
    /// Returns `None` when the candidate has no such marker or has drifted
    /// out of tolerance.
    #[must_use]
    pub fn new(dataset: &Dataset, candidate: NodeId, tolerance: &Tolerance) -> Option<Self> {
        let ConflationMarker::Duplicate { canonical } = *dataset.marker(candidate)? else {
            return None;
        };
        Self::for_canonical(dataset, candidate, canonical, tolerance)
    }

    /// Build a command folding `candidate` into `canonical`.
    ///
    /// Returns `None` unless both nodes exist, differ, and lie within the
    /// snapping distance of each other.
    #[must_use]
    pub fn for_canonical(
        dataset: &Dataset,
        candidate: NodeId,
        canonical: NodeId,
        tolerance: &Tolerance,
    ) -> Option<Self> {
        if candidate == canonical {
            return None;
        }
        let separation = distance_m(
            dataset.node_location(candidate)?,
            dataset.node_location(canonical)?,
        );
        if !tolerance.snaps(separation) {
            log::debug!("{candidate} is {separation:.1} m from {canonical}, not merging");
            return None;
        }
        Some(Self {
            candidate,
            canonical,
            log: EditLog::default(),
            executed: false,
        })
    }

    /// Node being folded away.
    #[must_use]
    pub const fn candidate(&self) -> NodeId {
        self.candidate
    }

    /// Node that survives.
    #[must_use]
    pub const fn canonical(&self) -> NodeId {
        self.canonical
    }

    /// Referrers of the candidate with the canonical node substituted.
    fn rewritten_ways(&self, dataset: &Dataset) -> Vec<(Way, bool)> {
        dataset
            .referrers(self.candidate)
            .filter_map(|id| dataset.way(id))
            .map(|way| {
                let mut nodes: Vec<NodeId> = way
                    .nodes
                    .iter()
                    .map(|node| {
                        if *node == self.candidate {
                            self.canonical
                        } else {
                            *node
                        }
                    })
                    .collect();
                nodes.dedup();
                let degenerate = nodes.len() < 2;
                let mut rewritten = way.clone();
                rewritten.nodes = nodes;
                (rewritten, degenerate)
            })
            .collect()
    }
}

impl ReversibleCommand for DuplicateCommand {
    fn execute(&mut self, dataset: &mut Dataset) -> Result<(), CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        let (Some(candidate), Some(canonical)) = (
            dataset.node(self.candidate).cloned(),
            dataset.node(self.canonical).cloned(),
        ) else {
            log::warn!(
                "{} or {} no longer exists, leaving both as they are",
                self.candidate,
                self.canonical
            );
            self.log = EditLog::default();
            self.executed = true;
            return Ok(());
        };

        let ways = self.rewritten_ways(dataset);
        let mut merged = canonical;
        for (key, value) in candidate.tags {
            merged.tags.entry(key).or_insert(value);
        }
        let candidate_id = self.candidate;
        self.log = EditLog::record(dataset, |edits, target| {
            for (way, degenerate) in ways {
                if degenerate {
                    log::warn!("{} collapses onto a single node, removing it", way.id);
                    edits.apply(target, Slot::Way(way.id, None))?;
                } else {
                    edits.apply(target, Slot::way(way))?;
                }
            }
            edits.touch(merged.id.into());
            edits.apply(target, Slot::node(merged))?;
            edits.apply(target, Slot::Marker(candidate_id, None))?;
            edits.apply(target, Slot::Node(candidate_id, None))?;
            edits.mark_merged(candidate_id);
            Ok(())
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
        format!("merge {} into {}", self.candidate, self.canonical)
    }
}
