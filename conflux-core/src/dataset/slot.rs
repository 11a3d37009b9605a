//! Snapshots of single dataset entries.
//!
//! Reversible edits are stored as `(before, after)` slot pairs; undo restores
//! each `before` slot in reverse order.

use crate::{ConflationMarker, Node, NodeId, PrimitiveId, Way, WayId};

/// Address of one entry that an edit can replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotKey {
    /// A node's location and tags.
    Node(NodeId),
    /// A way's node sequence and tags.
    Way(WayId),
    /// The marker attached to a node.
    Marker(NodeId),
}

impl SlotKey {
    /// Primitive the slot belongs to. Marker slots belong to their node.
    #[must_use]
    pub const fn primitive(self) -> PrimitiveId {
        match self {
            Self::Node(id) | Self::Marker(id) => PrimitiveId::Node(id),
            Self::Way(id) => PrimitiveId::Way(id),
        }
    }
}

/// Content of one entry, or its absence.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// A node, or `None` when the node does not exist.
    Node(NodeId, Option<Node>),
    /// A way, or `None` when the way does not exist.
    Way(WayId, Option<Way>),
    /// A node's marker, or `None` when it has none.
    Marker(NodeId, Option<ConflationMarker>),
}

impl Slot {
    /// Address of this slot.
    #[must_use]
    pub const fn key(&self) -> SlotKey {
        match self {
            Self::Node(id, _) => SlotKey::Node(*id),
            Self::Way(id, _) => SlotKey::Way(*id),
            Self::Marker(id, _) => SlotKey::Marker(*id),
        }
    }

    /// Return `true` when the slot holds content.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        match self {
            Self::Node(_, node) => node.is_some(),
            Self::Way(_, way) => way.is_some(),
            Self::Marker(_, marker) => marker.is_some(),
        }
    }

    /// Slot holding `node`.
    #[must_use]
    pub fn node(node: Node) -> Self {
        Self::Node(node.id, Some(node))
    }

    /// Slot holding `way`.
    #[must_use]
    pub fn way(way: Way) -> Self {
        Self::Way(way.id, Some(way))
    }
}
