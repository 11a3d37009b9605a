//! Slot-level edit recording and best-effort reversal.

use std::collections::{BTreeMap, BTreeSet};

use conflux_core::{ChangeSet, Dataset, DatasetError, NodeId, PrimitiveId, Slot, SlotKey, Way};

use crate::{CommandError, RestoreSummary};

#[derive(Debug, Clone)]
struct Edit {
    before: Slot,
    after: Slot,
}

#[derive(Debug, Default)]
struct Presence {
    existed: Option<bool>,
    exists: Option<bool>,
    changed: bool,
}

/// Ordered record of the slot edits made by one command.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use conflux_commands::EditLog;
/// use conflux_core::{Dataset, Node, NodeId, PrimitiveId, Slot};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut dataset = Dataset::new();
/// let node = Node::with_empty_tags(NodeId(-1), Coord { x: 0.0, y: 0.0 });
/// let mut log = EditLog::record(&mut dataset, |log, dataset| {
///     log.apply(dataset, Slot::node(node))
/// })?;
/// assert!(log.change_set().added.contains(&PrimitiveId::Node(NodeId(-1))));
///
/// log.revert(&mut dataset);
/// assert!(dataset.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EditLog {
    edits: Vec<Edit>,
    touched: BTreeSet<PrimitiveId>,
    merged: BTreeSet<NodeId>,
}

impl EditLog {
    /// Run `edits` against `dataset`, recording every slot they replace.
    ///
    /// # Errors
    ///
    /// Returns the first dataset error `edits` reports. Edits applied
    /// before the failure are reverted first.
    pub fn record<F>(dataset: &mut Dataset, edits: F) -> Result<Self, CommandError>
    where
        F: FnOnce(&mut Self, &mut Dataset) -> Result<(), DatasetError>,
    {
        let mut log = Self::default();
        if let Err(err) = edits(&mut log, dataset) {
            let summary = log.revert(dataset);
            if !summary.is_complete() {
                log::warn!(
                    "partial rollback after failed edit, skipped {:?}",
                    summary.skipped
                );
            }
            return Err(err.into());
        }
        Ok(log)
    }

    /// Overwrite one slot, remembering its previous content.
    ///
    /// Writing content identical to the current slot records nothing.
    ///
    /// # Errors
    ///
    /// Returns the dataset error of the write. Nothing is recorded then.
    pub fn apply(&mut self, dataset: &mut Dataset, after: Slot) -> Result<(), DatasetError> {
        let before = dataset.capture(after.key());
        if before == after {
            return Ok(());
        }
        dataset.restore(after.clone())?;
        self.edits.push(Edit { before, after });
        Ok(())
    }

    /// Report `id` as modified even if its content ends up unchanged.
    pub fn touch(&mut self, id: PrimitiveId) {
        self.touched.insert(id);
    }

    /// Report `node` as folded into another node instead of deleted.
    pub fn mark_merged(&mut self, node: NodeId) {
        self.merged.insert(node);
    }

    /// Number of recorded slot edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Return `true` when no slot edit was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Restore every recorded slot in reverse order and clear the log.
    ///
    /// A slot whose content a later, unrecorded edit removed is skipped
    /// rather than recreated. A way whose nodes have since disappeared is
    /// restored without them when at least two remain.
    pub fn revert(&mut self, dataset: &mut Dataset) -> RestoreSummary {
        self.touched.clear();
        self.merged.clear();
        let mut summary = RestoreSummary::default();
        for edit in std::mem::take(&mut self.edits).into_iter().rev() {
            let key = edit.before.key();
            if edit.after.is_present() && !dataset.capture(key).is_present() {
                if edit.before.is_present() {
                    log::warn!("not restoring {}: removed since the edit", key.primitive());
                    summary.skipped.push(key.primitive());
                } else {
                    summary.restored = summary.restored.saturating_add(1);
                }
                continue;
            }
            match restore_slot(dataset, edit.before) {
                Ok(()) => summary.restored = summary.restored.saturating_add(1),
                Err(err) => {
                    log::warn!("not restoring {}: {err}", key.primitive());
                    summary.skipped.push(key.primitive());
                }
            }
        }
        summary
    }

    /// Classify the primitives this log touched.
    ///
    /// Each slot is compared between its first recorded `before` and its
    /// last recorded `after`. A marker change counts as a modification of
    /// its node.
    #[must_use]
    pub fn change_set(&self) -> ChangeSet {
        let mut spans: BTreeMap<SlotKey, (&Slot, &Slot)> = BTreeMap::new();
        for edit in &self.edits {
            spans
                .entry(edit.after.key())
                .and_modify(|span| span.1 = &edit.after)
                .or_insert((&edit.before, &edit.after));
        }

        let mut presence: BTreeMap<PrimitiveId, Presence> = BTreeMap::new();
        for (key, (before, after)) in spans {
            let entry = presence.entry(key.primitive()).or_default();
            entry.changed |= before != after;
            if !matches!(key, SlotKey::Marker(_)) {
                entry.existed = Some(before.is_present());
                entry.exists = Some(after.is_present());
            }
        }
        for id in &self.touched {
            presence.entry(*id).or_default().changed = true;
        }

        let mut changes = ChangeSet::default();
        for (id, span) in presence {
            match (span.existed.unwrap_or(true), span.exists.unwrap_or(true)) {
                (false, true) => changes.record_added(id),
                (true, false) => changes.record_deleted(id),
                (true, true) if span.changed => changes.record_modified(id),
                _ => {}
            }
        }
        for node in &self.merged {
            changes.record_merged(*node);
        }
        changes
    }
}

fn restore_slot(dataset: &mut Dataset, slot: Slot) -> Result<(), DatasetError> {
    match slot {
        Slot::Way(_, Some(way)) => restore_way(dataset, way),
        other => dataset.restore(other),
    }
}

fn restore_way(dataset: &mut Dataset, way: Way) -> Result<(), DatasetError> {
    match dataset.put_way(way.clone()) {
        Err(DatasetError::MissingNode(missing)) => {
            let nodes = surviving_nodes(dataset, &way.nodes);
            if nodes.len() < 2 {
                return Err(DatasetError::MissingNode(missing));
            }
            log::warn!("restoring {} without nodes removed since the edit", way.id);
            let mut trimmed = way;
            trimmed.nodes = nodes;
            dataset.put_way(trimmed)
        }
        other => other,
    }
}

fn surviving_nodes(dataset: &Dataset, nodes: &[NodeId]) -> Vec<NodeId> {
    let mut kept: Vec<NodeId> = Vec::with_capacity(nodes.len());
    for node in nodes.iter().copied().filter(|n| dataset.contains_node(*n)) {
        if kept.last() != Some(&node) {
            kept.push(node);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{c, street};
    use conflux_core::{ConflationMarker, Node, WayId};
    use rstest::rstest;

    #[rstest]
    fn failed_record_rolls_back_earlier_edits() {
        let mut dataset = street();
        let before = dataset.clone();
        let result = EditLog::record(&mut dataset, |edits, target| {
            edits.apply(target, Slot::node(Node::with_empty_tags(NodeId(-9), c(0.2, 0.0))))?;
            edits.apply(target, Slot::Node(NodeId(1), None))
        });
        assert!(matches!(
            result,
            Err(CommandError::Dataset(DatasetError::NodeInUse { .. }))
        ));
        assert!(!dataset.contains_node(NodeId(-9)));
        assert_eq!(dataset.nodes().count(), before.nodes().count());
    }

    #[rstest]
    fn identical_writes_are_not_recorded() {
        let mut dataset = street();
        let way = dataset.way(WayId(1)).cloned().expect("street way");
        let log = EditLog::record(&mut dataset, |edits, target| {
            edits.apply(target, Slot::way(way))
        })
        .expect("no-op edit");
        assert!(log.is_empty());
        assert!(log.change_set().is_empty());
    }

    #[rstest]
    fn marker_only_edit_reports_node_as_modified() {
        let mut dataset = street();
        let log = EditLog::record(&mut dataset, |edits, target| {
            edits.apply(target, Slot::Marker(NodeId(-3), None))
        })
        .expect("strip marker");
        let changes = log.change_set();
        assert_eq!(
            changes.modified.into_iter().collect::<Vec<_>>(),
            vec![PrimitiveId::Node(NodeId(-3))]
        );
    }

    #[rstest]
    fn merged_nodes_are_not_reported_as_deleted() {
        let mut dataset = street();
        let mut log = EditLog::record(&mut dataset, |edits, target| {
            edits.apply(target, Slot::Marker(NodeId(-3), None))?;
            edits.apply(target, Slot::Node(NodeId(-3), None))
        })
        .expect("delete candidate");
        log.mark_merged(NodeId(-3));
        let changes = log.change_set();
        assert!(changes.deleted.is_empty());
        assert!(changes.merged.contains(&NodeId(-3)));
    }

    #[rstest]
    fn revert_skips_slots_removed_by_later_edits() {
        let mut dataset = street();
        let mut log = EditLog::record(&mut dataset, |edits, target| {
            edits.apply(
                target,
                Slot::way(Way::with_empty_tags(
                    WayId(1),
                    vec![NodeId(1), NodeId(-3), NodeId(2)],
                )),
            )
        })
        .expect("splice");
        dataset.remove_way(WayId(1));

        let summary = log.revert(&mut dataset);
        assert_eq!(summary.skipped, vec![PrimitiveId::Way(WayId(1))]);
        assert!(!dataset.contains_way(WayId(1)));
        assert!(log.change_set().is_empty());
    }

    #[rstest]
    fn revert_restores_ways_without_vanished_nodes() {
        let mut dataset = street();
        dataset
            .add_node(Node::with_empty_tags(NodeId(4), c(2.0, 0.0)))
            .expect("add node");
        dataset
            .set_way_nodes(WayId(1), vec![NodeId(1), NodeId(2), NodeId(4)])
            .expect("extend");
        let mut log = EditLog::record(&mut dataset, |edits, target| {
            edits.apply(
                target,
                Slot::way(Way::with_empty_tags(WayId(1), vec![NodeId(1), NodeId(2)])),
            )
        })
        .expect("shorten");
        dataset.remove_node(NodeId(4)).expect("remove unreferenced node");

        let summary = log.revert(&mut dataset);
        assert!(summary.is_complete());
        assert_eq!(
            dataset.way(WayId(1)).map(|way| way.nodes.clone()),
            Some(vec![NodeId(1), NodeId(2)])
        );
    }

    #[rstest]
    fn revert_restores_markers() {
        let mut dataset = street();
        let marker = dataset.marker(NodeId(-3)).copied();
        let mut log = EditLog::record(&mut dataset, |edits, target| {
            edits.apply(target, Slot::Marker(NodeId(-3), None))
        })
        .expect("strip marker");
        assert!(dataset.marker(NodeId(-3)).is_none());
        log.revert(&mut dataset);
        assert_eq!(dataset.marker(NodeId(-3)).copied(), marker);
        assert!(matches!(marker, Some(ConflationMarker::Connect { .. })));
    }
}
