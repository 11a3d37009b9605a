//! Dispatching a batch of candidates by their markers.

use std::collections::BTreeSet;

use conflux_core::{ChangeSet, ConflationMarker, Dataset, NodeId, PrimitiveId, Tolerance};

use crate::{
    CommandError, ConnectedCommand, DuplicateCommand, RestoreSummary, ReversibleCommand,
};

#[derive(Debug, Clone)]
enum Connection {
    Connect(ConnectedCommand),
    Duplicate(DuplicateCommand),
}

impl Connection {
    fn command(&mut self) -> &mut dyn ReversibleCommand {
        match self {
            Self::Connect(command) => command,
            Self::Duplicate(command) => command,
        }
    }

    fn change_set(&self) -> ChangeSet {
        match self {
            Self::Connect(command) => command.change_set(),
            Self::Duplicate(command) => command.change_set(),
        }
    }
}

/// Applies the markers of a batch of candidates as one atomic edit.
///
/// Each selected node, and each node of each selected way, is dispatched by
/// its marker: `Connect` becomes a [`ConnectedCommand`] and `Duplicate` a
/// [`DuplicateCommand`]. Candidates without a marker, or whose marker no
/// longer validates, are skipped.
///
/// # Examples
///
/// ```
/// use conflux_commands::{CreateConnectionsCommand, ReversibleCommand};
/// use conflux_core::{Dataset, Tolerance};
///
/// let dataset = Dataset::new();
/// let command = CreateConnectionsCommand::new(&dataset, &[], &Tolerance::default());
/// assert!(command.is_empty());
/// assert!(!command.description().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct CreateConnectionsCommand {
    connections: Vec<Connection>,
    skipped: usize,
    executed: bool,
}

impl CreateConnectionsCommand {
    /// Build sub-commands for every marked node reachable from `selection`.
    #[must_use]
    pub fn new(dataset: &Dataset, selection: &[PrimitiveId], tolerance: &Tolerance) -> Self {
        let mut connections = Vec::new();
        let mut skipped = 0_usize;
        for node in selected_nodes(dataset, selection) {
            let connection = match dataset.marker(node) {
                None => continue,
                Some(ConflationMarker::Connect { .. }) => {
                    ConnectedCommand::new(dataset, node, tolerance).map(Connection::Connect)
                }
                Some(ConflationMarker::Duplicate { .. }) => {
                    DuplicateCommand::new(dataset, node, tolerance).map(Connection::Duplicate)
                }
            };
            match connection {
                Some(valid) => connections.push(valid),
                None => {
                    log::debug!("marker on {node} no longer applies, skipping");
                    skipped = skipped.saturating_add(1);
                }
            }
        }
        Self {
            connections,
            skipped,
            executed: false,
        }
    }

    /// Number of sub-commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Return `true` when no candidate produced a sub-command.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of marked candidates whose marker failed re-validation.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    fn counts(&self) -> (usize, usize) {
        self.connections
            .iter()
            .fold((0_usize, 0_usize), |(connects, merges), connection| {
                match connection {
                    Connection::Connect(_) => (connects.saturating_add(1), merges),
                    Connection::Duplicate(_) => (connects, merges.saturating_add(1)),
                }
            })
    }
}

/// Nodes named by `selection`, expanding ways into their nodes, without
/// repeats and in first-seen order.
fn selected_nodes(dataset: &Dataset, selection: &[PrimitiveId]) -> Vec<NodeId> {
    let mut seen = BTreeSet::new();
    let mut nodes = Vec::new();
    for id in selection {
        let members = match id {
            PrimitiveId::Node(node) => vec![*node],
            PrimitiveId::Way(way) => dataset
                .way(*way)
                .map(|found| found.nodes.clone())
                .unwrap_or_default(),
        };
        nodes.extend(members.into_iter().filter(|node| seen.insert(*node)));
    }
    nodes
}

impl ReversibleCommand for CreateConnectionsCommand {
    fn execute(&mut self, dataset: &mut Dataset) -> Result<(), CommandError> {
        if self.executed {
            return Err(CommandError::AlreadyExecuted);
        }
        let mut done = 0_usize;
        let mut failure = None;
        for connection in &mut self.connections {
            match connection.command().execute(dataset) {
                Ok(()) => done = done.saturating_add(1),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        if let Some(err) = failure {
            log::warn!("connecting candidates failed, rolling back {done} edits: {err}");
            for connection in self.connections.iter_mut().take(done).rev() {
                if let Err(undo_err) = connection.command().undo(dataset) {
                    log::warn!("rollback of a connection failed: {undo_err}");
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
        for connection in self.connections.iter_mut().rev() {
            summary.merge(connection.command().undo(dataset)?);
        }
        self.executed = false;
        Ok(summary)
    }

    fn change_set(&self) -> ChangeSet {
        self.connections
            .iter()
            .fold(ChangeSet::default(), |changes, connection| {
                changes.then(connection.change_set())
            })
    }

    fn description(&self) -> String {
        let (connects, merges) = self.counts();
        if connects == 0 && merges == 0 {
            return "create connections: nothing to connect".to_owned();
        }
        format!("create connections: {connects} splice(s), {merges} merge(s)")
    }
}
