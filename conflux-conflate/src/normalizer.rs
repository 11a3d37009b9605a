//! Ordered tag rewriting for candidate primitives.

use conflux_core::{Dataset, PrimitiveId, TagMapping};

use crate::ConflationError;

/// Applies a [`TagMapping`] to every primitive of a dataset.
///
/// Rules with an empty source key are no-ops, so a partially filled mapping
/// never disturbs unrelated tags.
#[derive(Debug, Clone, Default)]
pub struct TagNormalizer {
    mapping: TagMapping,
}

impl TagNormalizer {
    /// Create a normaliser applying `mapping`.
    #[must_use]
    pub const fn new(mapping: TagMapping) -> Self {
        Self { mapping }
    }

    /// Rewrite the tags of every node and way in `candidates`.
    ///
    /// Returns the number of primitives whose tags changed.
    ///
    /// # Errors
    ///
    /// Propagates [`ConflationError::Dataset`] from the tag update.
    pub fn normalize(&self, candidates: &mut Dataset) -> Result<usize, ConflationError> {
        if self.mapping.is_empty() {
            return Ok(0);
        }
        let ids: Vec<PrimitiveId> = candidates
            .nodes()
            .map(|node| node.id.into())
            .chain(candidates.ways().map(|way| way.id.into()))
            .collect();
        let mut changed = 0;
        for id in ids {
            if candidates.update_tags(id, |tags| self.mapping.apply(tags))? {
                changed += 1;
            }
        }
        log::debug!("normalised tags on {changed} primitive(s)");
        Ok(changed)
    }
}
