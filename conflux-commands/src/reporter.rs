//! Handing change sets to whoever publishes them.

use conflux_core::ChangeSet;

/// Receives the change set of an applied command, for example to upload
/// it or show it to a reviewer.
pub trait ChangeReporter {
    /// Report one change set.
    fn report(&self, changes: &ChangeSet);
}

/// Reporter that logs change-set counts at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ChangeReporter for LogReporter {
    fn report(&self, changes: &ChangeSet) {
        log::info!(
            "{} added, {} modified, {} deleted, {} merged",
            changes.added.len(),
            changes.modified.len(),
            changes.deleted.len(),
            changes.merged.len()
        );
    }
}

impl<F> ChangeReporter for F
where
    F: Fn(&ChangeSet),
{
    fn report(&self, changes: &ChangeSet) {
        self(changes);
    }
}
