//! Reversible edits that apply conflation markers to a target dataset.
//!
//! Every command records its edits as `(before, after)` pairs of dataset
//! slots in an [`EditLog`]. Undo restores the `before` slots in reverse
//! order, so an executed and undone command leaves node sequences, tags and
//! markers exactly as it found them.
//!
//! - [`ConnectedCommand`] splices a candidate node into an existing edge.
//! - [`DuplicateCommand`] folds a candidate node into a canonical node.
//! - [`CreateConnectionsCommand`] dispatches a batch of candidates by marker.
//! - [`AddCandidatesCommand`] moves candidates into the target dataset.
//! - [`CommandSequence`] composes any of the above into one atomic unit.
//!
//! [`import_candidates`] wires the last three together for the common case.
#![forbid(unsafe_code)]

mod add;
mod command;
mod connected;
mod connections;
mod duplicate;
mod edit;
mod error;
mod reporter;
mod sequence;

pub use add::{AddCandidatesCommand, selection_of};
pub use command::{ReversibleCommand, RestoreSummary};
pub use connected::ConnectedCommand;
pub use connections::CreateConnectionsCommand;
pub use duplicate::DuplicateCommand;
pub use edit::EditLog;
pub use error::CommandError;
pub use reporter::{ChangeReporter, LogReporter};
pub use sequence::{CommandSequence, import_candidates};

#[cfg(test)]
pub(crate) mod fixtures;
