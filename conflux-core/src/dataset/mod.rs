//! In-memory store of nodes and ways.
//!
//! A [`Dataset`] owns its primitives in identifier-keyed arenas and keeps a
//! reverse index from each node to the ways referencing it. Every mutation
//! goes through methods that maintain three invariants:
//!
//! - every way references only nodes that exist;
//! - no way references the same node twice in a row;
//! - conflation markers are attached only to local nodes.
//!
//! Mutations are also recorded in a change tracker, so callers can ask which
//! primitives changed since the last [`Dataset::snapshot`].

mod error;
mod shared;
mod slot;

use std::collections::{BTreeMap, BTreeSet};

use geo::Coord;

pub use error::DatasetError;
pub use shared::SharedDataset;
pub use slot::{Slot, SlotKey};

use crate::primitive::first_adjacent_duplicate;
use crate::{ChangeSet, ConflationMarker, Node, NodeId, PrimitiveId, Tags, Way, WayId};

/// Mapping from identifiers in an absorbed dataset to their new identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    /// Node identifier translations.
    pub nodes: BTreeMap<NodeId, NodeId>,
    /// Way identifier translations.
    pub ways: BTreeMap<WayId, WayId>,
}

impl IdMap {
    /// Translate a primitive identifier, if it was absorbed.
    #[must_use]
    pub fn get(&self, id: PrimitiveId) -> Option<PrimitiveId> {
        match id {
            PrimitiveId::Node(node) => self.nodes.get(&node).copied().map(PrimitiveId::Node),
            PrimitiveId::Way(way) => self.ways.get(&way).copied().map(PrimitiveId::Way),
        }
    }
}

/// Nodes and ways with referential integrity and change tracking.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use conflux_core::{Dataset, Node, Way};
///
/// # fn main() -> Result<(), conflux_core::DatasetError> {
/// let mut dataset = Dataset::new();
/// let a = dataset.allocate_node_id();
/// let b = dataset.allocate_node_id();
/// dataset.add_node(Node::with_empty_tags(a, Coord { x: 0.0, y: 0.0 }))?;
/// dataset.add_node(Node::with_empty_tags(b, Coord { x: 0.0, y: 1.0 }))?;
/// let way = dataset.allocate_way_id();
/// dataset.add_way(Way::with_empty_tags(way, vec![a, b]))?;
///
/// assert_eq!(dataset.referrers(a).collect::<Vec<_>>(), vec![way]);
/// assert!(dataset.is_modified());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    nodes: BTreeMap<NodeId, Node>,
    ways: BTreeMap<WayId, Way>,
    referrers: BTreeMap<NodeId, BTreeSet<WayId>>,
    markers: BTreeMap<NodeId, ConflationMarker>,
    changes: ChangeSet,
    last_local_node: i64,
    last_local_way: i64,
}

impl Dataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a way.
    #[must_use]
    pub fn way(&self, id: WayId) -> Option<&Way> {
        self.ways.get(&id)
    }

    /// Location of a node.
    #[must_use]
    pub fn node_location(&self, id: NodeId) -> Option<Coord<f64>> {
        self.nodes.get(&id).map(|node| node.location)
    }

    /// Return `true` when the node exists.
    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Return `true` when the way exists.
    #[must_use]
    pub fn contains_way(&self, id: WayId) -> bool {
        self.ways.contains_key(&id)
    }

    /// Iterate over nodes in identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// Iterate over ways in identifier order.
    pub fn ways(&self) -> impl Iterator<Item = &Way> + '_ {
        self.ways.values()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of ways.
    #[must_use]
    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Return `true` when the dataset holds no primitives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty()
    }

    /// Ways referencing `node`, in identifier order.
    pub fn referrers(&self, node: NodeId) -> impl Iterator<Item = WayId> + '_ {
        self.referrers.get(&node).into_iter().flatten().copied()
    }

    /// Coordinates of a way's nodes in sequence order.
    #[must_use]
    pub fn way_coords(&self, id: WayId) -> Option<Vec<Coord<f64>>> {
        let way = self.ways.get(&id)?;
        Some(
            way.nodes
                .iter()
                .filter_map(|node| self.node_location(*node))
                .collect(),
        )
    }

    /// Reserve a fresh local node identifier.
    pub fn allocate_node_id(&mut self) -> NodeId {
        self.last_local_node = self.last_local_node.saturating_sub(1);
        NodeId(self.last_local_node)
    }

    /// Reserve a fresh local way identifier.
    pub fn allocate_way_id(&mut self) -> WayId {
        self.last_local_way = self.last_local_way.saturating_sub(1);
        WayId(self.last_local_way)
    }

    /// Insert a new node.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::DuplicateNode`] when the identifier is taken.
    pub fn add_node(&mut self, node: Node) -> Result<(), DatasetError> {
        if self.nodes.contains_key(&node.id) {
            return Err(DatasetError::DuplicateNode(node.id));
        }
        self.put_node(node);
        Ok(())
    }

    /// Insert a new way.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::DuplicateWay`] when the identifier is taken,
    /// or any error [`Dataset::put_way`] reports.
    pub fn add_way(&mut self, way: Way) -> Result<(), DatasetError> {
        if self.ways.contains_key(&way.id) {
            return Err(DatasetError::DuplicateWay(way.id));
        }
        self.put_way(way)
    }

    /// Insert or replace a node, keeping the ways that reference it.
    pub fn put_node(&mut self, node: Node) {
        let id = node.id;
        if id.is_local() {
            self.last_local_node = self.last_local_node.min(id.0);
        }
        match self.nodes.insert(id, node) {
            None => self.changes.record_added(id.into()),
            Some(previous) => {
                if self.nodes.get(&id) != Some(&previous) {
                    self.changes.record_modified(id.into());
                }
            }
        }
    }

    /// Insert or replace a way.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::MissingNode`] when a referenced node does not
    /// exist and [`DatasetError::AdjacentDuplicate`] when the sequence
    /// repeats a node back to back. The dataset is unchanged on error.
    pub fn put_way(&mut self, way: Way) -> Result<(), DatasetError> {
        if let Some(missing) = way.nodes.iter().find(|n| !self.nodes.contains_key(n)) {
            return Err(DatasetError::MissingNode(*missing));
        }
        if let Some(node) = first_adjacent_duplicate(&way.nodes) {
            return Err(DatasetError::AdjacentDuplicate { way: way.id, node });
        }
        let id = way.id;
        if id.is_local() {
            self.last_local_way = self.last_local_way.min(id.0);
        }
        self.link(&way);
        match self.ways.insert(id, way) {
            None => self.changes.record_added(id.into()),
            Some(previous) => {
                self.unlink_stale(&previous);
                if self.ways.get(&id) != Some(&previous) {
                    self.changes.record_modified(id.into());
                }
            }
        }
        Ok(())
    }

    /// Replace the node sequence of an existing way.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::MissingWay`] when the way does not exist, or
    /// any error [`Dataset::put_way`] reports.
    pub fn set_way_nodes(&mut self, id: WayId, nodes: Vec<NodeId>) -> Result<(), DatasetError> {
        let mut way = self.ways.get(&id).cloned().ok_or(DatasetError::MissingWay(id))?;
        way.nodes = nodes;
        self.put_way(way)
    }

    /// Remove a way, returning it.
    pub fn remove_way(&mut self, id: WayId) -> Option<Way> {
        let way = self.ways.remove(&id)?;
        for node in &way.nodes {
            if let Some(set) = self.referrers.get_mut(node) {
                set.remove(&id);
                if set.is_empty() {
                    self.referrers.remove(node);
                }
            }
        }
        self.changes.record_deleted(id.into());
        Some(way)
    }

    /// Remove a node together with its marker, returning the node.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::NodeInUse`] while any way references the node.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Option<Node>, DatasetError> {
        if let Some(way) = self.referrers(id).next() {
            return Err(DatasetError::NodeInUse { node: id, way });
        }
        let removed = self.nodes.remove(&id);
        if removed.is_some() {
            self.markers.remove(&id);
            self.changes.record_deleted(id.into());
        }
        Ok(removed)
    }

    /// Apply `edit` to the tags of a primitive.
    ///
    /// Returns whether the tags changed.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::MissingNode`] or [`DatasetError::MissingWay`]
    /// when the primitive does not exist.
    pub fn update_tags(
        &mut self,
        id: PrimitiveId,
        edit: impl FnOnce(&mut Tags),
    ) -> Result<bool, DatasetError> {
        let tags = match id {
            PrimitiveId::Node(node) => {
                &mut self
                    .nodes
                    .get_mut(&node)
                    .ok_or(DatasetError::MissingNode(node))?
                    .tags
            }
            PrimitiveId::Way(way) => {
                &mut self
                    .ways
                    .get_mut(&way)
                    .ok_or(DatasetError::MissingWay(way))?
                    .tags
            }
        };
        let before = tags.clone();
        edit(tags);
        let changed = *tags != before;
        if changed {
            self.changes.record_modified(id);
        }
        Ok(changed)
    }

    /// Marker attached to `node`, if any.
    #[must_use]
    pub fn marker(&self, node: NodeId) -> Option<&ConflationMarker> {
        self.markers.get(&node)
    }

    /// Iterate over all markers in node order.
    pub fn markers(&self) -> impl Iterator<Item = (NodeId, &ConflationMarker)> + '_ {
        self.markers.iter().map(|(id, marker)| (*id, marker))
    }

    /// Attach `marker` to a local node, returning any marker it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::MissingNode`] when the node does not exist and
    /// [`DatasetError::MarkerOnPermanent`] when it is not local.
    pub fn set_marker(
        &mut self,
        node: NodeId,
        marker: ConflationMarker,
    ) -> Result<Option<ConflationMarker>, DatasetError> {
        if !self.nodes.contains_key(&node) {
            return Err(DatasetError::MissingNode(node));
        }
        if !node.is_local() {
            return Err(DatasetError::MarkerOnPermanent(node));
        }
        let previous = self.markers.insert(node, marker);
        if previous != Some(marker) {
            self.changes.record_modified(node.into());
        }
        Ok(previous)
    }

    /// Detach and return the marker on `node`.
    pub fn take_marker(&mut self, node: NodeId) -> Option<ConflationMarker> {
        let removed = self.markers.remove(&node);
        if removed.is_some() {
            self.changes.record_modified(node.into());
        }
        removed
    }

    /// Capture the current content of one slot.
    #[must_use]
    pub fn capture(&self, key: SlotKey) -> Slot {
        match key {
            SlotKey::Node(id) => Slot::Node(id, self.nodes.get(&id).cloned()),
            SlotKey::Way(id) => Slot::Way(id, self.ways.get(&id).cloned()),
            SlotKey::Marker(id) => Slot::Marker(id, self.markers.get(&id).copied()),
        }
    }

    /// Overwrite one slot with captured content.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying mutation, for example
    /// [`DatasetError::NodeInUse`] when clearing a node that a way still
    /// references. The dataset is unchanged on error.
    pub fn restore(&mut self, slot: Slot) -> Result<(), DatasetError> {
        match slot {
            Slot::Node(_, Some(node)) => {
                self.put_node(node);
                Ok(())
            }
            Slot::Node(id, None) => self.remove_node(id).map(drop),
            Slot::Way(_, Some(way)) => self.put_way(way),
            Slot::Way(id, None) => {
                self.remove_way(id);
                Ok(())
            }
            Slot::Marker(id, Some(marker)) => self.set_marker(id, marker).map(drop),
            Slot::Marker(id, None) => {
                self.take_marker(id);
                Ok(())
            }
        }
    }

    /// Move every primitive of `other` into this dataset.
    ///
    /// Local primitives receive fresh local identifiers. Permanent primitives
    /// keep theirs, and an existing permanent primitive wins over the
    /// incoming copy. Markers follow their nodes.
    pub fn absorb(&mut self, other: Self) -> IdMap {
        let mut map = IdMap::default();
        for (id, mut node) in other.nodes {
            let target = if id.is_local() {
                self.allocate_node_id()
            } else {
                id
            };
            map.nodes.insert(id, target);
            if self.nodes.contains_key(&target) {
                continue;
            }
            node.id = target;
            self.put_node(node);
        }
        for (id, mut way) in other.ways {
            let target = if id.is_local() {
                self.allocate_way_id()
            } else {
                id
            };
            map.ways.insert(id, target);
            if self.ways.contains_key(&target) {
                continue;
            }
            way.id = target;
            way.nodes = way
                .nodes
                .iter()
                .map(|node| map.nodes.get(node).copied().unwrap_or(*node))
                .collect();
            if let Err(err) = self.put_way(way) {
                log::warn!("dropping way {id} while merging datasets: {err}");
            }
        }
        for (id, marker) in other.markers {
            if let Some(target) = map.nodes.get(&id).copied() {
                if let Err(err) = self.set_marker(target, marker) {
                    log::warn!("dropping marker on {id} while merging datasets: {err}");
                }
            }
        }
        map
    }

    /// Changes recorded since the last snapshot.
    #[must_use]
    pub const fn pending_changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Return `true` when any change was recorded since the last snapshot.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Take the recorded changes and start a fresh window.
    pub fn snapshot(&mut self) -> ChangeSet {
        std::mem::take(&mut self.changes)
    }

    fn link(&mut self, way: &Way) {
        for node in &way.nodes {
            self.referrers.entry(*node).or_default().insert(way.id);
        }
    }

    fn unlink_stale(&mut self, previous: &Way) {
        let current: BTreeSet<NodeId> = self
            .ways
            .get(&previous.id)
            .map(|way| way.nodes.iter().copied().collect())
            .unwrap_or_default();
        for node in previous.nodes.iter().filter(|n| !current.contains(n)) {
            if let Some(set) = self.referrers.get_mut(node) {
                set.remove(&previous.id);
                if set.is_empty() {
                    self.referrers.remove(node);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
