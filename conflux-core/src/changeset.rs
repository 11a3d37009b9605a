//! Summaries of what an operation did to a dataset.

use std::collections::BTreeSet;

use crate::{NodeId, PrimitiveId};

/// Primitives added, modified, and deleted by an operation.
///
/// The three sets are disjoint. Candidate nodes folded into a canonical node
/// are listed in `merged` rather than `deleted`; they never existed
/// upstream, so they are not deletions a reviewer needs to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeSet {
    /// Primitives that did not exist before.
    pub added: BTreeSet<PrimitiveId>,
    /// Primitives that existed before and after with different content.
    pub modified: BTreeSet<PrimitiveId>,
    /// Primitives that existed before and no longer exist.
    pub deleted: BTreeSet<PrimitiveId>,
    /// Candidate nodes absorbed into canonical nodes.
    pub merged: BTreeSet<NodeId>,
}

impl ChangeSet {
    /// Return `true` when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
            && self.merged.is_empty()
    }

    /// Number of net-new primitives introduced by the operation.
    #[must_use]
    pub fn net_new_count(&self) -> usize {
        self.added.len()
    }

    /// Record that `id` came into existence.
    pub fn record_added(&mut self, id: PrimitiveId) {
        if self.deleted.remove(&id) {
            self.modified.insert(id);
        } else if !self.modified.contains(&id) {
            self.added.insert(id);
        }
    }

    /// Record that `id` changed in place.
    pub fn record_modified(&mut self, id: PrimitiveId) {
        if !self.added.contains(&id) && !self.deleted.contains(&id) {
            self.modified.insert(id);
        }
    }

    /// Record that `id` ceased to exist.
    pub fn record_deleted(&mut self, id: PrimitiveId) {
        if self.added.remove(&id) {
            return;
        }
        self.modified.remove(&id);
        self.deleted.insert(id);
    }

    /// Record that the candidate node `id` was folded into another node.
    pub fn record_merged(&mut self, id: NodeId) {
        let primitive = PrimitiveId::Node(id);
        self.added.remove(&primitive);
        self.modified.remove(&primitive);
        self.deleted.remove(&primitive);
        self.merged.insert(id);
    }

    /// Compose with a change set describing a later operation.
    ///
    /// The result describes both operations applied in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use conflux_core::{ChangeSet, NodeId, PrimitiveId};
    ///
    /// let id = PrimitiveId::Node(NodeId(-1));
    /// let mut first = ChangeSet::default();
    /// first.record_added(id);
    /// let mut second = ChangeSet::default();
    /// second.record_modified(id);
    ///
    /// let combined = first.then(second);
    /// assert!(combined.added.contains(&id));
    /// assert!(combined.modified.is_empty());
    /// ```
    #[must_use]
    pub fn then(mut self, later: Self) -> Self {
        for id in later.deleted {
            self.record_deleted(id);
        }
        for id in later.added {
            self.record_added(id);
        }
        for id in later.modified {
            self.record_modified(id);
        }
        for id in later.merged {
            self.record_merged(id);
        }
        self
    }
}
