//! The conflation pipeline.

use conflux_core::{Dataset, ReferenceDataset, Session, TagMapping, Tolerance};

use crate::{
    AlreadyAddedRemover, ArtifactCleaner, ConflationError, DuplicateSegmentResolver,
    MarkerAnnotator, TagNormalizer,
};

/// Counts from one [`ConflationEngine::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConflationReport {
    /// Primitives whose tags the mapping changed.
    pub tags_normalized: usize,
    /// Candidate ways dropped because the reference already has them.
    pub ways_already_present: usize,
    /// Nodes dropped with those ways.
    pub nodes_already_present: usize,
    /// Node references spliced into overlapping ways.
    pub nodes_spliced: usize,
    /// Coincident nodes merged into one.
    pub nodes_unified: usize,
    /// Ways deleted as structural duplicates or collapsed by unification.
    pub ways_deduplicated: usize,
    /// Conflation markers attached to way ends.
    pub markers_added: usize,
}

/// Runs the conflation steps, in order, over a candidate dataset.
///
/// # Examples
///
/// ```
/// use conflux_conflate::ConflationEngine;
/// use conflux_core::{Dataset, Tolerance, TagMapping};
///
/// # fn main() -> Result<(), conflux_conflate::ConflationError> {
/// let engine = ConflationEngine::new(Tolerance::default(), TagMapping::new());
/// let mut candidates = Dataset::new();
/// let report = engine.run(&mut candidates, &Dataset::new())?;
/// assert_eq!(report.markers_added, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConflationEngine {
    tolerance: Tolerance,
    mapping: TagMapping,
}

impl ConflationEngine {
    /// Create an engine.
    #[must_use]
    pub const fn new(tolerance: Tolerance, mapping: TagMapping) -> Self {
        Self { tolerance, mapping }
    }

    /// Create an engine using the settings of `session`.
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self::new(*session.tolerance(), session.tag_mapping().clone())
    }

    /// Thresholds in use.
    #[must_use]
    pub const fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    /// Conflate `candidates` against `reference`.
    ///
    /// Only `candidates` is modified.
    ///
    /// # Errors
    ///
    /// Returns [`ConflationError`] when a step's edit is rejected.
    pub fn run<R>(
        &self,
        candidates: &mut Dataset,
        reference: &R,
    ) -> Result<ConflationReport, ConflationError>
    where
        R: ReferenceDataset + ?Sized,
    {
        let tags_normalized = TagNormalizer::new(self.mapping.clone()).normalize(candidates)?;
        let removal = AlreadyAddedRemover::new(self.tolerance).remove(candidates, reference)?;
        let resolution = DuplicateSegmentResolver::new(self.tolerance).resolve_all(candidates)?;
        let duplicates = ArtifactCleaner.clean(candidates)?;
        let markers_added = MarkerAnnotator::new(self.tolerance).annotate(candidates, reference)?;

        let report = ConflationReport {
            tags_normalized,
            ways_already_present: removal.ways.len(),
            nodes_already_present: removal.nodes.len(),
            nodes_spliced: resolution.inserted,
            nodes_unified: resolution.unified,
            ways_deduplicated: duplicates.len() + resolution.collapsed,
            markers_added,
        };
        log::info!(
            "conflation: {} tag rewrite(s), {} way(s) already present, {} node(s) spliced, \
             {} node(s) unified, {} duplicate way(s), {} marker(s)",
            report.tags_normalized,
            report.ways_already_present,
            report.nodes_spliced,
            report.nodes_unified,
            report.ways_deduplicated,
            report.markers_added
        );
        Ok(report)
    }
}
