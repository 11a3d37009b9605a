//! Removal of ways left with identical node sequences.

use std::collections::BTreeMap;

use conflux_core::{Dataset, NodeId, WayId};

use crate::{ConflationError, merge_tags, way_rank};

/// Deletes structurally duplicated ways.
///
/// Ways whose node sequences are equal, read forwards or backwards, are
/// grouped. The lowest identity in each group survives (permanent
/// identities first) and absorbs the others' tags without overwriting its
/// own values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactCleaner;

impl ArtifactCleaner {
    /// Remove duplicate ways from `dataset`, returning the deleted
    /// identifiers.
    ///
    /// # Errors
    ///
    /// Propagates [`ConflationError::Dataset`] from the tag merge.
    pub fn clean(self, dataset: &mut Dataset) -> Result<Vec<WayId>, ConflationError> {
        let mut groups: BTreeMap<Vec<NodeId>, Vec<WayId>> = BTreeMap::new();
        for way in dataset.ways() {
            let reversed: Vec<NodeId> = way.nodes.iter().rev().copied().collect();
            let key = reversed.min(way.nodes.clone());
            groups.entry(key).or_default().push(way.id);
        }

        let mut removed = Vec::new();
        for mut members in groups.into_values().filter(|members| members.len() > 1) {
            members.sort_by_key(|id| way_rank(*id));
            let Some((survivor, duplicates)) = members.split_first() else {
                continue;
            };
            for duplicate in duplicates {
                let Some(way) = dataset.remove_way(*duplicate) else {
                    continue;
                };
                log::debug!("way {duplicate} duplicates way {survivor}");
                dataset.update_tags((*survivor).into(), |tags| merge_tags(tags, way.tags))?;
                removed.push(*duplicate);
            }
        }
        removed.sort_unstable();
        Ok(removed)
    }
}
