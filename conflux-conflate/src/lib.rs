//! Conflation of fetched candidate geometry against existing data.
//!
//! The [`ConflationEngine`] runs a fixed pipeline over a candidate
//! [`Dataset`](conflux_core::Dataset):
//!
//! 1. [`TagNormalizer`] rewrites tags with the configured mapping.
//! 2. [`AlreadyAddedRemover`] drops candidate ways that the reference data
//!    already contains.
//! 3. [`DuplicateSegmentResolver`] splices nodes into overlapping ways and
//!    unifies coincident endpoints so shared geometry shares nodes.
//! 4. [`ArtifactCleaner`] deletes ways left with identical node sequences.
//! 5. [`MarkerAnnotator`] records how each remaining way end should join the
//!    reference data.
//!
//! The reference data is only ever borrowed immutably.
#![forbid(unsafe_code)]

mod annotator;
mod cleaner;
mod engine;
mod error;
mod normalizer;
mod remover;
mod resolver;

pub use annotator::MarkerAnnotator;
pub use cleaner::ArtifactCleaner;
pub use engine::{ConflationEngine, ConflationReport};
pub use error::ConflationError;
pub use normalizer::TagNormalizer;
pub use remover::{AlreadyAddedRemover, Removal};
pub use resolver::{DuplicateSegmentResolver, Resolution};

use conflux_core::{NodeId, Tags, WayId};

/// Ordering key choosing which of two primitives survives a merge.
///
/// Permanent identities outrank local ones; otherwise the lower identity
/// wins.
pub(crate) const fn node_rank(id: NodeId) -> (bool, i64) {
    (id.is_local(), id.0)
}

/// Way counterpart of [`node_rank`].
pub(crate) const fn way_rank(id: WayId) -> (bool, i64) {
    (id.is_local(), id.0)
}

/// Copy `incoming` tags onto `survivor` without overwriting existing keys.
pub(crate) fn merge_tags(survivor: &mut Tags, incoming: Tags) {
    for (key, value) in incoming {
        survivor.entry(key).or_insert(value);
    }
}
