//! Errors raised while conflating.

use conflux_core::{DatasetError, WayId};
use thiserror::Error;

/// Errors returned by the conflation steps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflationError {
    /// A way named by the caller does not exist in the candidate dataset.
    #[error("way {0} is not in the candidate dataset")]
    UnknownWay(WayId),
    /// The candidate dataset rejected an edit.
    #[error("candidate dataset rejected an edit: {0}")]
    Dataset(#[from] DatasetError),
}
