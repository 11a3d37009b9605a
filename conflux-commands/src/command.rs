//! The command contract shared by every reversible edit.

use std::fmt::Debug;

use conflux_core::{ChangeSet, Dataset, PrimitiveId};

use crate::CommandError;

/// Outcome of an undo.
///
/// Undo is best effort: when an unrelated edit removed a primitive the
/// command depended on, the affected slot is skipped rather than recreated
/// from nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Number of slots put back.
    pub restored: usize,
    /// Primitives whose slots could not be put back.
    pub skipped: Vec<PrimitiveId>,
}

impl RestoreSummary {
    /// Return `true` when every slot was restored.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Fold another summary into this one.
    pub fn merge(&mut self, other: Self) {
        self.restored = self.restored.saturating_add(other.restored);
        self.skipped.extend(other.skipped);
    }
}

/// An edit that can be applied to a dataset and taken back.
///
/// Commands move between two states. A fresh command is unexecuted;
/// [`execute`](Self::execute) moves it to executed and
/// [`undo`](Self::undo) moves it back. Calls made in the wrong state fail
/// with [`CommandError::AlreadyExecuted`] or [`CommandError::NotExecuted`]
/// and leave the dataset untouched.
pub trait ReversibleCommand: Debug + Send {
    /// Apply the edit.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::AlreadyExecuted`] when called twice, or the
    /// dataset error that aborted the edit. A failed execute leaves the
    /// dataset as it was.
    fn execute(&mut self, dataset: &mut Dataset) -> Result<(), CommandError>;

    /// Take the edit back.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NotExecuted`] unless the command is executed.
    fn undo(&mut self, dataset: &mut Dataset) -> Result<RestoreSummary, CommandError>;

    /// Primitives the last execute added, modified, or deleted.
    ///
    /// Empty while the command is unexecuted.
    fn change_set(&self) -> ChangeSet;

    /// Short human-readable summary. Never empty.
    fn description(&self) -> String;
}
