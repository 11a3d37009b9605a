//! Errors raised while executing or undoing commands.

use conflux_core::DatasetError;
use thiserror::Error;

/// Errors raised by [`ReversibleCommand`](crate::ReversibleCommand) methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// `execute` was called on a command that is already executed.
    #[error("command has already been executed")]
    AlreadyExecuted,
    /// `undo` was called on a command that is not executed.
    #[error("command has not been executed")]
    NotExecuted,
    /// The dataset rejected one of the command's edits.
    #[error("dataset rejected an edit: {0}")]
    Dataset(#[from] DatasetError),
}
