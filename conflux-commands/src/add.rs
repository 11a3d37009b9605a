//! Moving selected candidates into the target dataset.

use std::collections::{BTreeMap, BTreeSet};

use conflux_core::{
    ChangeSet, ConflationMarker, Dataset, IdMap, Node, NodeId, PrimitiveId, Slot, Way, WayId,
};

use crate::{CommandError, EditLog, RestoreSummary, ReversibleCommand};

/// Every way of `dataset` plus every node no way references.
///
/// Passing the result to [`AddCandidatesCommand::new`] moves the whole
/// dataset, standalone points included.
#[must_use]
pub fn selection_of(dataset: &Dataset) -> Vec<PrimitiveId> {
    let ways = dataset.ways().map(|way| PrimitiveId::Way(way.id));
    let points = dataset
        .nodes()
        .filter(|node| dataset.referrers(node.id).next().is_none())
        .map(|node| PrimitiveId::Node(node.id));
    ways.chain(points).collect()
}

/// Copies selected candidate ways and nodes, with their markers, into a
/// target dataset.
///
/// Local candidates receive fresh local identifiers in the target. The
/// identifiers are chosen on the first execute and reused when the command
/// is executed again after an undo, so later commands can keep referring to
/// them. Permanent primitives the target already holds are left alone.
#[derive(Debug, Clone)]
pub struct AddCandidatesCommand {
    nodes: Vec<Node>,
    ways: Vec<Way>,
    markers: Vec<(NodeId, ConflationMarker)>,
    id_map: Option<IdMap>,
    log: EditLog,
    executed: bool,
}

impl AddCandidatesCommand {
    /// Capture the primitives named by `selection`.
    ///
    /// Ways bring their nodes along. Identifiers missing from `candidates`
    /// are ignored.
    #[must_use]
    pub fn new(candidates: &Dataset, selection: &[PrimitiveId]) -> Self {
        let mut node_ids = BTreeSet::new();
        let mut ways: BTreeMap<WayId, Way> = BTreeMap::new();
        for id in selection {
            match *id {
                PrimitiveId::Node(node) => {
                    node_ids.insert(node);
                }
                PrimitiveId::Way(way) => {
                    let Some(found) = candidates.way(way) else {
                        log::debug!("{way} is not a candidate, ignoring it");
                        continue;
                    };
                    node_ids.extend(found.nodes.iter().copied());
                    ways.insert(way, found.clone());
                }
            }
        }
        let nodes: Vec<Node> = node_ids
            .iter()
            .filter_map(|id| candidates.node(*id).cloned())
            .collect();
        let markers = nodes
            .iter()
            .filter_map(|node| candidates.marker(node.id).map(|marker| (node.id, *marker)))
            .collect();
        Self {
            nodes,
            ways: ways.into_values().collect(),
            markers,
            id_map: None,
            log: EditLog::default(),
            executed: false,
        }
    }

    /// Candidate identifiers mapped to their identifiers in the target.
    ///
    /// `None` until the first execute.
    #[must_use]
    pub const fn id_map(&self) -> Option<&IdMap> {
        self.id_map.as_ref()
    }

    /// Translate candidate identifiers into target identifiers, dropping
    /// any that were not moved.
    #[must_use]
    pub fn translate(&self, selection: &[PrimitiveId]) -> Vec<PrimitiveId> {
        let Some(map) = &self.id_map else {
            return Vec::new();
        };
        selection.iter().filter_map(|id| map.get(*id)).collect()
    }

    fn allocate(&self, target: &mut Dataset) -> IdMap {
        let mut map = IdMap::default();
        for node in &self.nodes {
            let id = if node.id.is_local() {
                target.allocate_node_id()
            } else {
                node.id
            };
            map.nodes.insert(node.id, id);
        }
        for way in &self.ways {
            let id = if way.id.is_local() {
                target.allocate_way_id()
            } else {
                way.id
            };
            map.ways.insert(way.id, id);
        }
        map
    }

    fn slots(&self, map: &IdMap, target: &Dataset) -> Vec<Slot> {
        let mut slots = Vec::new();
        for node in &self.nodes {
            let Some(id) = map.nodes.get(&node.id).copied() else {
                continue;
            };
            if !id.is_local() && target.contains_node(id) {
                continue;
            }
            let mut moved = node.clone();
            moved.id = id;
            slots.push(Slot::node(moved));
        }
        for way in &self.ways {
            let Some(id) = map.ways.get(&way.id).copied() else {
                continue;
            };
            if !id.is_local() && target.contains_way(id) {
                continue;
            }
            let mut moved = way.clone();
            moved.id = id;
            moved.nodes = way
                .nodes
                .iter()
                .map(|node| map.nodes.get(node).copied().unwrap_or(*node))
                .collect();
            slots.push(Slot::way(moved));
        }
        for (node, marker) in &self.markers {
            if let Some(id) = map.nodes.get(node).copied().filter(|id| id.is_local()) {
                slots.push(Slot::Marker(id, Some(*marker)));
            }
        }
        slots
    }
}

impl ReversibleCommand for AddCandidatesCommand {
    fn execute(&mut self, dataset: &mut Dataset) -> Result<(), CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        let map = self
            .id_map
            .take()
            .unwrap_or_else(|| self.allocate(dataset));
        let slots = self.slots(&map, dataset);
        self.id_map = Some(map);
        self.log = EditLog::record(dataset, |edits, target| {
            for slot in slots {
                edits.apply(target, slot)?;
            }
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
        format!(
            "add {} candidate node(s) and {} way(s)",
            self.nodes.len(),
            self.ways.len()
        )
    }
}
