use thiserror::Error;

use crate::{NodeId, WayId};

/// Errors raised by [`Dataset`](super::Dataset) mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    /// A node with this identifier already exists.
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),
    /// A way with this identifier already exists.
    #[error("way {0} already exists")]
    DuplicateWay(WayId),
    /// The referenced node does not exist.
    #[error("node {0} does not exist")]
    MissingNode(NodeId),
    /// The referenced way does not exist.
    #[error("way {0} does not exist")]
    MissingWay(WayId),
    /// A way referenced the same node twice in a row.
    #[error("way {way} references node {node} twice in a row")]
    AdjacentDuplicate {
        /// Offending way.
        way: WayId,
        /// Repeated node.
        node: NodeId,
    },
    /// A node cannot be removed while a way references it.
    #[error("node {node} is still referenced by way {way}")]
    NodeInUse {
        /// Node that was to be removed.
        node: NodeId,
        /// A way still referencing it.
        way: WayId,
    },
    /// Conflation markers may only be attached to local nodes.
    #[error("node {0} is permanent and cannot carry a conflation marker")]
    MarkerOnPermanent(NodeId),
    /// A thread panicked while holding the dataset lock.
    #[error("dataset lock poisoned by a panicked writer")]
    Poisoned,
}
