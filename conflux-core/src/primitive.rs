//! Nodes and ways, the two primitives the conflation pipeline edits.

use std::collections::BTreeMap;

use geo::Coord;

use crate::{NodeId, WayId};

/// Free-form key/value tags.
///
/// A sorted map keeps iteration, serialisation, and tag merges deterministic.
pub type Tags = BTreeMap<String, String>;

/// A point with tags.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use conflux_core::{Node, NodeId};
///
/// let node = Node::with_empty_tags(NodeId(-1), Coord { x: 13.4, y: 52.5 });
/// assert!(node.id.is_local());
/// assert!(node.tags.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Position as longitude (`x`) and latitude (`y`) in degrees.
    pub location: Coord<f64>,
    /// OpenStreetMap-style tags.
    pub tags: Tags,
}

impl Node {
    /// Construct a node.
    #[must_use]
    pub const fn new(id: NodeId, location: Coord<f64>, tags: Tags) -> Self {
        Self { id, location, tags }
    }

    /// Construct a node without tags.
    #[must_use]
    pub const fn with_empty_tags(id: NodeId, location: Coord<f64>) -> Self {
        Self::new(id, location, Tags::new())
    }
}

/// An ordered sequence of node references with tags.
///
/// A way whose first and last references are equal is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Way {
    /// Unique identifier.
    pub id: WayId,
    /// Ordered node references.
    pub nodes: Vec<NodeId>,
    /// OpenStreetMap-style tags.
    pub tags: Tags,
}

impl Way {
    /// Construct a way.
    #[must_use]
    pub const fn new(id: WayId, nodes: Vec<NodeId>, tags: Tags) -> Self {
        Self { id, nodes, tags }
    }

    /// Construct a way without tags.
    #[must_use]
    pub const fn with_empty_tags(id: WayId, nodes: Vec<NodeId>) -> Self {
        Self::new(id, nodes, Tags::new())
    }

    /// Return `true` when the way starts and ends on the same node.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }

    /// Return `true` when `node` is referenced by this way.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// First node reference, if any.
    #[must_use]
    pub fn first_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// Last node reference, if any.
    #[must_use]
    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Iterate over consecutive node pairs.
    pub fn segments(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes.windows(2).filter_map(|pair| match pair {
            [a, b] => Some((*a, *b)),
            _ => None,
        })
    }
}

/// First node referenced twice in a row by `nodes`, if any.
#[must_use]
pub fn first_adjacent_duplicate(nodes: &[NodeId]) -> Option<NodeId> {
    nodes.windows(2).find_map(|pair| match pair {
        [a, b] if a == b => Some(*a),
        _ => None,
    })
}
