//! Error types emitted by the Conflux CLI.
//!
//! Many helpers return `Result<_, CliError>`, so large payloads are boxed
//! or reduced to their message.

use std::sync::Arc;

use camino::Utf8PathBuf;
use conflux_commands::CommandError;
use conflux_conflate::ConflationError;
use conflux_core::{BoundingBoxError, DatasetError, SourceError};
use conflux_fetch::http::SourceBuildError;
use thiserror::Error;

/// Errors emitted by the Conflux CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The region could not be parsed.
    #[error("invalid --{field} {input:?}: {source}")]
    InvalidBoundingBox {
        field: &'static str,
        input: String,
        #[source]
        source: BoundingBoxError,
    },
    /// A numeric option was outside its accepted range.
    #[error("invalid --{field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },
    /// A tag rule was not of the form `from=>to`.
    #[error("invalid tag rule {rule:?}, expected from=>to")]
    InvalidTagRule { rule: String },
    /// The log level is not one of trace, debug, info, warn, error.
    #[error("unsupported log level {level:?}, expected trace|debug|info|warn|error")]
    InvalidLogLevel { level: String },
    /// The logger could not be started.
    #[error("failed to start logging: {0}")]
    Logging(#[from] flexi_logger::FlexiLoggerError),
    /// The geometry source could not be built.
    #[error("failed to build geometry source: {0}")]
    BuildSource(#[from] SourceBuildError),
    /// Reading the reference dataset failed.
    #[error("failed to read reference data at {path:?}: {source}")]
    ReadReference {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The reference dataset was not a GeoJSON feature collection.
    #[error("failed to parse reference data at {path:?}: {source}")]
    ParseReference {
        path: Utf8PathBuf,
        #[source]
        source: SourceError,
    },
    /// A dataset operation failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// The conflation pass failed.
    #[error("conflation failed: {0}")]
    Conflation(#[from] ConflationError),
    /// Importing the conflated candidates failed.
    #[error("import failed: {0}")]
    Command(#[from] CommandError),
    /// Serialising the import summary failed.
    #[error("failed to serialise import summary: {0}")]
    SerialiseSummary(#[source] serde_json::Error),
    /// Writing the import summary failed.
    #[error("failed to write import summary: {0}")]
    WriteSummary(#[source] std::io::Error),
}
