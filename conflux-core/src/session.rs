//! Configuration shared by one conflation run.

use crate::{SharedDataset, TagMapping, Tolerance};

/// The target dataset and the settings used to conflate into it.
///
/// Passed explicitly to every component so that nothing depends on
/// process-wide state.
///
/// # Examples
///
/// ```
/// use conflux_core::{Dataset, Session, SharedDataset, Tolerance};
///
/// let session = Session::new(SharedDataset::new(Dataset::new()))
///     .with_tolerance(Tolerance::default().with_snap_distance_m(3.0));
/// assert_eq!(session.tolerance().snap_distance_m, 3.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Session {
    target: SharedDataset,
    tolerance: Tolerance,
    tag_mapping: TagMapping,
}

impl Session {
    /// Create a session editing `target` with default settings.
    #[must_use]
    pub fn new(target: SharedDataset) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Set the snapping and collinearity thresholds.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the tag rewrite rules.
    #[must_use]
    pub fn with_tag_mapping(mut self, mapping: TagMapping) -> Self {
        self.tag_mapping = mapping;
        self
    }

    /// Dataset that commands edit.
    #[must_use]
    pub const fn target(&self) -> &SharedDataset {
        &self.target
    }

    /// Snapping and collinearity thresholds.
    #[must_use]
    pub const fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    /// Tag rewrite rules.
    #[must_use]
    pub const fn tag_mapping(&self) -> &TagMapping {
        &self.tag_mapping
    }
}
