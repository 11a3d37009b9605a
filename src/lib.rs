//! Facade crate for the Conflux conflation toolkit.
//!
//! This crate re-exports the data model, the conflation engine and the
//! reversible command layer. The tiled HTTP fetcher is available behind the
//! `fetch-http` feature.

#![forbid(unsafe_code)]

pub use conflux_core::{
    BoundingBox, BoundingBoxError, ChangeSet, ConflationMarker, Dataset, DatasetBuilder,
    DatasetError, Feature, FeatureGeometry, GeometrySource, IdMap, IdentitySpace,
    IndexedReference, Node, NodeId, PrimitiveId, ReferenceDataset, Session, SharedDataset,
    SourceError, Tag, TagMapping, Tags, Tolerance, Way, WayId,
};

pub use conflux_conflate::{ConflationEngine, ConflationError, ConflationReport};

pub use conflux_commands::{
    AddCandidatesCommand, ChangeReporter, CommandError, CommandSequence, ConnectedCommand,
    CreateConnectionsCommand, DuplicateCommand, LogReporter, RestoreSummary, ReversibleCommand,
    import_candidates, selection_of,
};

#[cfg(feature = "fetch-http")]
pub use conflux_fetch::{
    FetchConfig, FetchReport, TileFailure, TiledFetchOrchestrator, http::HttpGeometrySource,
    plan_tiles,
};
