//! Identifiers for nodes and ways.
//!
//! Negative identifiers denote local, not-yet-uploaded primitives created by
//! this process. Positive identifiers denote permanent primitives that exist
//! upstream. Zero is never allocated.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Identifier of a [`Node`](crate::Node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(pub i64);

/// Identifier of a [`Way`](crate::Way).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WayId(pub i64);

macro_rules! impl_identity {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            /// Return `true` when the identifier names a local primitive.
            #[must_use]
            pub const fn is_local(self) -> bool {
                self.0 < 0
            }

            /// Return `true` when the identifier names a permanent primitive.
            #[must_use]
            pub const fn is_permanent(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $ty {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s
                    .trim()
                    .strip_prefix($prefix)
                    .ok_or_else(|| IdParseError::MissingPrefix {
                        expected: $prefix,
                        input: s.to_owned(),
                    })?;
                let raw = digits
                    .parse::<i64>()
                    .map_err(|source| IdParseError::InvalidNumber {
                        input: s.to_owned(),
                        source,
                    })?;
                if raw == 0 {
                    return Err(IdParseError::Zero {
                        input: s.to_owned(),
                    });
                }
                Ok(Self(raw))
            }
        }
    };
}

impl_identity!(NodeId, 'n');
impl_identity!(WayId, 'w');

/// Errors raised when parsing a prefixed identifier such as `n-3` or `w12`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    /// The input did not start with the expected type prefix.
    #[error("expected identifier prefixed with '{expected}', found {input:?}")]
    MissingPrefix {
        /// Prefix character required for the identifier type.
        expected: char,
        /// Offending input.
        input: String,
    },
    /// The numeric portion could not be parsed.
    #[error("invalid identifier {input:?}: {source}")]
    InvalidNumber {
        /// Offending input.
        input: String,
        /// Underlying integer parse failure.
        #[source]
        source: std::num::ParseIntError,
    },
    /// Zero is not a valid identifier.
    #[error("identifier {input:?} must not be zero")]
    Zero {
        /// Offending input.
        input: String,
    },
}

/// Identity of any primitive held by a [`Dataset`](crate::Dataset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PrimitiveId {
    /// A node.
    Node(NodeId),
    /// A way.
    Way(WayId),
}

impl PrimitiveId {
    /// Return `true` when the primitive is local.
    #[must_use]
    pub const fn is_local(self) -> bool {
        match self {
            Self::Node(id) => id.is_local(),
            Self::Way(id) => id.is_local(),
        }
    }
}

impl fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => id.fmt(f),
            Self::Way(id) => id.fmt(f),
        }
    }
}

impl From<NodeId> for PrimitiveId {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<WayId> for PrimitiveId {
    fn from(id: WayId) -> Self {
        Self::Way(id)
    }
}
