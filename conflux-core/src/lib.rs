//! Core data model for conflating candidate geometry into existing map data.
//!
//! The crate defines the primitives ([`Node`], [`Way`]), the [`Dataset`]
//! that owns them, the conflation markers that describe how candidates join
//! existing data, and the traits at the edges of the system:
//! [`GeometrySource`] for fetching candidates and [`ReferenceDataset`] for
//! comparing them against what already exists.
//!
//! Identifiers are signed: negative values are local candidates created by
//! this process, positive values are permanent upstream primitives.
#![forbid(unsafe_code)]

pub mod bbox;
pub mod changeset;
pub mod dataset;
pub mod feature;
pub mod geometry;
pub mod ids;
pub mod marker;
pub mod primitive;
pub mod reference;
pub mod session;
pub mod source;
pub mod tags;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tolerance;

pub use bbox::{BoundingBox, BoundingBoxError};
pub use changeset::ChangeSet;
pub use dataset::{Dataset, DatasetError, IdMap, SharedDataset, Slot, SlotKey};
pub use feature::{DatasetBuilder, Feature, FeatureGeometry, IdentitySpace};
pub use ids::{IdParseError, NodeId, PrimitiveId, WayId};
pub use marker::{ConflationMarker, MarkerParseError};
pub use primitive::{Node, Tags, Way};
pub use reference::{IndexedReference, NearbyNode, NearbySegment, ReferenceDataset, SegmentRef};
pub use session::Session;
pub use source::{GeometrySource, SourceError};
pub use tags::{Tag, TagMapping};
pub use tolerance::Tolerance;
