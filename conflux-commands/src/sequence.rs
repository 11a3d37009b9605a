//! Composing commands into one atomic unit.

use conflux_core::{ChangeSet, Dataset, PrimitiveId, Tolerance};

use crate::{
    AddCandidatesCommand, CommandError, CreateConnectionsCommand, RestoreSummary,
    ReversibleCommand,
};

/// Commands executed in order and undone in reverse order as a unit.
///
/// If one command fails to execute, the ones before it are undone and the
/// error is returned, so a sequence is either fully applied or not at all.
#[derive(Debug, Default)]
pub struct CommandSequence {
    commands: Vec<Box<dyn ReversibleCommand>>,
    executed: bool,
}

impl CommandSequence {
    /// Create an empty, unexecuted sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command. Has no effect on an executed sequence's dataset
    /// until the sequence is undone and executed again.
    #[must_use]
    pub fn with(mut self, command: impl ReversibleCommand + 'static) -> Self {
        self.commands.push(Box::new(command));
        self
    }

    /// Wrap commands that the caller has already executed in order.
    fn already_executed(commands: Vec<Box<dyn ReversibleCommand>>) -> Self {
        Self {
            commands,
            executed: true,
        }
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Return `true` when the sequence holds no command.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Return `true` while the sequence is applied.
    #[must_use]
    pub const fn is_executed(&self) -> bool {
        self.executed
    }
}

impl ReversibleCommand for CommandSequence {
    fn execute(&mut self, dataset: &mut Dataset) -> Result<(), CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        let mut done = 0_usize;
        let mut failure = None;
        for command in &mut self.commands {
            match command.execute(dataset) {
                Ok(()) => done = done.saturating_add(1),
                Err(err) => {
                    log::warn!("{} failed, rolling back: {err}", command.description());
                    failure = Some(err);
                    break;
                }
            }
        }
        if let Some(err) = failure {
            for command in self.commands.iter_mut().take(done).rev() {
                if let Err(undo_err) = command.undo(dataset) {
                    log::warn!("rollback of {} failed: {undo_err}", command.description());
                }
            }
            return Err(err);
        }
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, dataset: &mut Dataset) -> Result<RestoreSummary, CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        let mut summary = RestoreSummary::default();
        for command in self.commands.iter_mut().rev() {
            summary.merge(command.undo(dataset)?);
        }
        self.executed = false;
        Ok(summary)
    }

    fn change_set(&self) -> ChangeSet {
        self.commands
            .iter()
            .fold(ChangeSet::default(), |changes, command| {
                changes.then(command.change_set())
            })
    }

    fn description(&self) -> String {
        if self.commands.is_empty() {
            return "empty command sequence".to_owned();
        }
        self.commands
            .iter()
            .map(|command| command.description())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Move candidates into `target` and apply their markers, as one unit.
///
/// Runs an [`AddCandidatesCommand`] for `selection`, then a
/// [`CreateConnectionsCommand`] over the moved primitives. The returned
/// sequence is already executed; undo it to take the whole import back.
///
/// # Errors
///
/// Returns the error of whichever step failed. The target is left as it
/// was in that case.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use conflux_commands::{ReversibleCommand, import_candidates, selection_of};
/// use conflux_core::{Dataset, Node, NodeId, Tolerance};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut candidates = Dataset::new();
/// candidates.add_node(Node::with_empty_tags(NodeId(-1), Coord { x: 0.0, y: 0.0 }))?;
/// let mut target = Dataset::new();
///
/// let mut import = import_candidates(
///     &mut target,
///     &candidates,
///     &selection_of(&candidates),
///     &Tolerance::default(),
/// )?;
/// assert_eq!(import.change_set().net_new_count(), 1);
/// import.undo(&mut target)?;
/// assert!(target.is_empty());
/// # Ok(())
/// # }
/// ```
pub fn import_candidates(
    target: &mut Dataset,
    candidates: &Dataset,
    selection: &[PrimitiveId],
    tolerance: &Tolerance,
) -> Result<CommandSequence, CommandError> {
    let mut add = AddCandidatesCommand::new(candidates, selection);
    add.execute(target)?;
    let moved = add.translate(selection);
    let mut connect = CreateConnectionsCommand::new(target, &moved, tolerance);
    if let Err(err) = connect.execute(target) {
        add.undo(target)?;
        return Err(err);
    }
    log::info!(
        "imported {} primitive(s): {}",
        moved.len(),
        connect.description()
    );
    Ok(CommandSequence::already_executed(vec![
        Box::new(add),
        Box::new(connect),
    ]))
}
