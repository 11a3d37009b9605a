//! Conflation markers attached to candidate nodes.
//!
//! Markers live in a side table of the [`Dataset`](crate::Dataset), never in
//! the public tag map. The textual encodings below are only used when a
//! geometry source ships markers as feature properties.

use std::fmt;

use thiserror::Error;

use crate::ids::IdParseError;
use crate::{NodeId, Tags, WayId};

/// Property key carrying an encoded [`ConflationMarker::Connect`].
pub const CONNECT_KEY: &str = "conn";

/// Property key carrying an encoded [`ConflationMarker::Duplicate`].
pub const DUPLICATE_KEY: &str = "dupe";

/// Instruction describing how a candidate node joins existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConflationMarker {
    /// Insert the candidate into `way` between the two anchor nodes.
    Connect {
        /// Way receiving the candidate.
        way: WayId,
        /// First anchor node.
        first: NodeId,
        /// Second anchor node.
        second: NodeId,
    },
    /// Replace the candidate with the canonical node everywhere.
    Duplicate {
        /// Node the candidate is folded into.
        canonical: NodeId,
    },
}

/// Errors raised when decoding a marker from source properties.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerParseError {
    /// The encoded value did not have the expected number of parts.
    #[error("marker {key}={value:?} has {found} parts, expected {expected}")]
    WrongArity {
        /// Reserved key that held the value.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Number of comma-separated parts required.
        expected: usize,
        /// Number found.
        found: usize,
    },
    /// A referenced identifier was malformed.
    #[error("marker {key} references an invalid identifier: {source}")]
    Identifier {
        /// Reserved key that held the value.
        key: &'static str,
        /// Underlying parse failure.
        #[source]
        source: IdParseError,
    },
    /// Both reserved keys were present on one feature.
    #[error("feature carries both conn and dupe markers")]
    Conflicting,
}

impl ConflationMarker {
    /// Decode a `Connect` marker from `w<way>,n<first>,n<second>`.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerParseError`] for malformed values.
    pub fn parse_connect(value: &str) -> Result<Self, MarkerParseError> {
        let parts: Vec<&str> = value.split(',').collect();
        let [way, first, second] = parts.as_slice() else {
            return Err(MarkerParseError::WrongArity {
                key: CONNECT_KEY,
                value: value.to_owned(),
                expected: 3,
                found: parts.len(),
            });
        };
        let identifier = |source| MarkerParseError::Identifier {
            key: CONNECT_KEY,
            source,
        };
        Ok(Self::Connect {
            way: way.parse().map_err(identifier)?,
            first: first.parse().map_err(identifier)?,
            second: second.parse().map_err(identifier)?,
        })
    }

    /// Decode a `Duplicate` marker from `n<canonical>`.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerParseError`] for malformed values.
    pub fn parse_duplicate(value: &str) -> Result<Self, MarkerParseError> {
        let canonical = value
            .parse()
            .map_err(|source| MarkerParseError::Identifier {
                key: DUPLICATE_KEY,
                source,
            })?;
        Ok(Self::Duplicate { canonical })
    }

    /// Remove the reserved keys from `tags` and decode whichever is present.
    ///
    /// The keys are stripped even when decoding fails so that encoded
    /// markers never leak into the public tag map.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerParseError`] for malformed or conflicting values.
    pub fn take_from_tags(tags: &mut Tags) -> Result<Option<Self>, MarkerParseError> {
        let connect = tags.remove(CONNECT_KEY);
        let duplicate = tags.remove(DUPLICATE_KEY);
        match (connect, duplicate) {
            (None, None) => Ok(None),
            (Some(value), None) => Self::parse_connect(&value).map(Some),
            (None, Some(value)) => Self::parse_duplicate(&value).map(Some),
            (Some(_), Some(_)) => Err(MarkerParseError::Conflicting),
        }
    }

    /// Reserved key and encoded value for this marker.
    #[must_use]
    pub fn encode(&self) -> (&'static str, String) {
        match self {
            Self::Connect { way, first, second } => {
                (CONNECT_KEY, format!("{way},{first},{second}"))
            }
            Self::Duplicate { canonical } => (DUPLICATE_KEY, canonical.to_string()),
        }
    }
}

impl fmt::Display for ConflationMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (key, value) = self.encode();
        write!(f, "{key}={value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn decodes_connect_marker() {
        let marker = ConflationMarker::parse_connect("w7,n1,n2").expect("valid marker");
        assert_eq!(
            marker,
            ConflationMarker::Connect {
                way: WayId(7),
                first: NodeId(1),
                second: NodeId(2),
            }
        );
        assert_eq!(marker.to_string(), "conn=w7,n1,n2");
    }

    #[rstest]
    #[case("w7,n1")]
    #[case("n7,n1,n2")]
    #[case("w7,n1,nx")]
    fn rejects_malformed_connect_values(#[case] value: &str) {
        assert!(ConflationMarker::parse_connect(value).is_err());
    }

    #[rstest]
    fn take_from_tags_strips_reserved_keys() {
        let mut tags = Tags::new();
        tags.insert("highway".into(), "residential".into());
        tags.insert(DUPLICATE_KEY.into(), "n12".into());
        let marker = ConflationMarker::take_from_tags(&mut tags).expect("valid marker");
        assert_eq!(
            marker,
            Some(ConflationMarker::Duplicate {
                canonical: NodeId(12)
            })
        );
        assert!(!tags.contains_key(DUPLICATE_KEY));
        assert_eq!(tags.len(), 1);
    }

    #[rstest]
    fn malformed_values_are_still_stripped() {
        let mut tags = Tags::new();
        tags.insert(CONNECT_KEY.into(), "garbage".into());
        assert!(ConflationMarker::take_from_tags(&mut tags).is_err());
        assert!(tags.is_empty());
    }

    #[rstest]
    fn conflicting_keys_are_rejected() {
        let mut tags = Tags::new();
        tags.insert(CONNECT_KEY.into(), "w1,n1,n2".into());
        tags.insert(DUPLICATE_KEY.into(), "n3".into());
        assert_eq!(
            ConflationMarker::take_from_tags(&mut tags),
            Err(MarkerParseError::Conflicting)
        );
    }
}
