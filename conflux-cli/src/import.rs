//! Import command: fetch candidates for a region, conflate them against
//! reference data and apply them as reversible commands.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use conflux_commands::{
    ChangeReporter, LogReporter, ReversibleCommand, import_candidates, selection_of,
};
use conflux_conflate::{ConflationEngine, ConflationReport};
use conflux_core::{
    BoundingBox, ChangeSet, Dataset, DatasetBuilder, GeometrySource, IdentitySpace,
    IndexedReference, Session, SharedDataset, Tag, TagMapping, Tolerance,
};
use conflux_fetch::http::{HttpGeometrySource, parse_feature_collection};
use conflux_fetch::{FetchConfig, TileFailure, TiledFetchOrchestrator};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::logging::init_logging;
use crate::{
    ARG_BBOX, ARG_LOG_LEVEL, ARG_MAX_ANGLE, ARG_MAX_TILE_SIDE, ARG_OUTPUT, ARG_REFERENCE,
    ARG_SNAP_DISTANCE, ARG_SOURCE_URL, ARG_TAG_RULES, ARG_WORKERS, CliError, ENV_BBOX,
    ENV_SOURCE_URL,
};

/// Separator between tag rules in `--tag-rules`.
const RULE_SEPARATOR: char = ';';
/// Separator between the matched and replacement tag of one rule.
const RULE_ARROW: &str = "=>";

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch candidate geometry for a bounding box from a GeoJSON tile \
                 service, conflate it against a reference GeoJSON file and apply \
                 the result. A JSON summary of the changes is written to stdout \
                 or --output.",
    about = "Fetch, conflate and import candidate geometry"
)]
#[ortho_config(prefix = "CONFLUX")]
pub(crate) struct ImportArgs {
    /// Region as `min_lon,min_lat,max_lon,max_lat`.
    #[arg(long = ARG_BBOX, value_name = "bbox", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// Tile URL template; `{bbox}` is replaced by each tile's
    /// `min_lon,min_lat,max_lon,max_lat`.
    #[arg(long = ARG_SOURCE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) source_url: Option<String>,
    /// GeoJSON file holding the existing map data.
    #[arg(long = ARG_REFERENCE, value_name = "path")]
    #[serde(default)]
    pub(crate) reference: Option<Utf8PathBuf>,
    /// Longest tile side in metres.
    #[arg(long = ARG_MAX_TILE_SIDE, value_name = "metres")]
    #[serde(default)]
    pub(crate) max_tile_side: Option<f64>,
    /// Number of tiles fetched at once.
    #[arg(long = ARG_WORKERS, value_name = "count")]
    #[serde(default)]
    pub(crate) workers: Option<usize>,
    /// Snapping distance in metres.
    #[arg(long = ARG_SNAP_DISTANCE, value_name = "metres")]
    #[serde(default)]
    pub(crate) snap_distance: Option<f64>,
    /// Largest angle in degrees between segments treated as collinear.
    #[arg(long = ARG_MAX_ANGLE, value_name = "degrees")]
    #[serde(default)]
    pub(crate) max_angle: Option<f64>,
    /// Tag rewrite rules, e.g. `highway=footpath=>highway=footway;fixme=>`.
    #[arg(long = ARG_TAG_RULES, value_name = "rules")]
    #[serde(default)]
    pub(crate) tag_rules: Option<String>,
    /// Write the summary here instead of stdout.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// One of trace, debug, info, warn, error.
    #[arg(long = ARG_LOG_LEVEL, value_name = "level")]
    #[serde(default)]
    pub(crate) log_level: Option<String>,
}

impl ImportArgs {
    pub(crate) fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImportConfig {
    pub(crate) region: BoundingBox,
    pub(crate) source_url: String,
    pub(crate) reference: Option<Utf8PathBuf>,
    pub(crate) fetch: FetchConfig,
    pub(crate) tolerance: Tolerance,
    pub(crate) tag_mapping: TagMapping,
    pub(crate) output: Option<Utf8PathBuf>,
    pub(crate) log_level: Option<String>,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let bbox = args.bbox.ok_or(CliError::MissingArgument {
            field: ARG_BBOX,
            env: ENV_BBOX,
        })?;
        let source_url = args.source_url.ok_or(CliError::MissingArgument {
            field: ARG_SOURCE_URL,
            env: ENV_SOURCE_URL,
        })?;
        let region = bbox
            .parse::<BoundingBox>()
            .map_err(|source| CliError::InvalidBoundingBox {
                field: ARG_BBOX,
                input: bbox.clone(),
                source,
            })?;

        let mut fetch = FetchConfig::default();
        if let Some(metres) = args.max_tile_side {
            fetch = fetch.with_max_tile_side_m(positive(ARG_MAX_TILE_SIDE, metres)?);
        }
        if let Some(workers) = args.workers {
            if workers == 0 {
                return Err(CliError::InvalidOption {
                    field: ARG_WORKERS,
                    reason: "at least one worker is required".to_owned(),
                });
            }
            fetch = fetch.with_max_workers(workers);
        }

        let mut tolerance = Tolerance::default();
        if let Some(metres) = args.snap_distance {
            tolerance = tolerance.with_snap_distance_m(positive(ARG_SNAP_DISTANCE, metres)?);
        }
        if let Some(degrees) = args.max_angle {
            if !(0.0..=90.0).contains(&degrees) {
                return Err(CliError::InvalidOption {
                    field: ARG_MAX_ANGLE,
                    reason: format!("{degrees} is outside 0..=90"),
                });
            }
            tolerance = tolerance.with_max_angle_deg(degrees);
        }

        let tag_mapping = match args.tag_rules.as_deref() {
            Some(rules) => parse_tag_rules(rules)?,
            None => TagMapping::new(),
        };

        Ok(Self {
            region,
            source_url,
            reference: args.reference,
            fetch,
            tolerance,
            tag_mapping,
            output: args.output,
            log_level: args.log_level,
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<f64, CliError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CliError::InvalidOption {
            field,
            reason: format!("{value} is not a positive number"),
        })
    }
}

/// Parse `from=>to` rules separated by `;`.
///
/// Either side is a tag in `key=value` or bare `key` form. An empty right
/// hand side deletes the matched tag.
pub(crate) fn parse_tag_rules(rules: &str) -> Result<TagMapping, CliError> {
    rules
        .split(RULE_SEPARATOR)
        .map(str::trim)
        .filter(|rule| !rule.is_empty())
        .try_fold(TagMapping::new(), |mapping, rule| {
            let Some((from, to)) = rule.split_once(RULE_ARROW) else {
                return Err(CliError::InvalidTagRule {
                    rule: rule.to_owned(),
                });
            };
            if from.trim().is_empty() {
                return Err(CliError::InvalidTagRule {
                    rule: rule.to_owned(),
                });
            }
            let Ok(matched) = from.parse::<Tag>();
            let Ok(replacement) = to.parse::<Tag>();
            Ok(mapping.with_rule(matched, replacement))
        })
}

/// A tile that contributed nothing to the import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTile {
    /// Position in the tile plan.
    pub index: usize,
    /// Tile bounds as `min_lon,min_lat,max_lon,max_lat`.
    pub bbox: String,
    /// Why the fetch failed.
    pub error: String,
}

impl From<&TileFailure> for FailedTile {
    fn from(failure: &TileFailure) -> Self {
        Self {
            index: failure.index,
            bbox: failure.tile.to_string(),
            error: failure.error.to_string(),
        }
    }
}

/// Outcome of one `import` run, written as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    /// Number of tiles requested.
    pub tiles: usize,
    /// Tiles whose fetch failed.
    pub failed_tiles: Vec<FailedTile>,
    /// Counts from the conflation pass.
    pub conflation: ConflationReport,
    /// Primitives touched in the reference data.
    pub changes: ChangeSet,
    /// Number of primitives the import added.
    pub net_new: usize,
    /// Human-readable description of the applied commands.
    pub description: String,
}

/// Builds the geometry source for an import run.
pub(crate) trait SourceBuilder {
    fn build(&self, config: &ImportConfig) -> Result<Box<dyn GeometrySource>, CliError>;
}

pub(crate) struct HttpSourceBuilder;

impl SourceBuilder for HttpSourceBuilder {
    fn build(&self, config: &ImportConfig) -> Result<Box<dyn GeometrySource>, CliError> {
        Ok(Box::new(HttpGeometrySource::new(config.source_url.clone())?))
    }
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let _logger = init_logging(config.log_level.as_deref())?;
    match config.output.clone() {
        Some(path) => {
            let mut file =
                std::fs::File::create(path.as_std_path()).map_err(CliError::WriteSummary)?;
            run_import_with(&config, &HttpSourceBuilder, &mut file)
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            run_import_with(&config, &HttpSourceBuilder, &mut stdout)
        }
    }
}

pub(crate) fn run_import_with(
    config: &ImportConfig,
    builder: &dyn SourceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let source = builder.build(config)?;
    let summary = execute_import(config, source.as_ref(), &LogReporter)?;
    write_summary(writer, &summary)
}

/// Run the fetch, conflate and import pipeline against `source`.
pub(crate) fn execute_import(
    config: &ImportConfig,
    source: &dyn GeometrySource,
    reporter: &dyn ChangeReporter,
) -> Result<ImportSummary, CliError> {
    let reference = match config.reference.as_deref() {
        Some(path) => load_reference(path)?,
        None => Dataset::new(),
    };
    let session = Session::new(SharedDataset::new(reference))
        .with_tolerance(config.tolerance)
        .with_tag_mapping(config.tag_mapping.clone());

    let orchestrator = TiledFetchOrchestrator::with_config(source, config.fetch);
    let fetched = orchestrator.fetch(&config.region);
    let failed_tiles: Vec<FailedTile> = fetched.failures.iter().map(FailedTile::from).collect();
    for failure in &failed_tiles {
        log::warn!("tile {} ({}) failed: {}", failure.index, failure.bbox, failure.error);
    }
    let mut candidates = fetched.dataset;

    let mut target = session.target().lock()?;
    let conflation = {
        let index = IndexedReference::new(&target);
        ConflationEngine::from_session(&session).run(&mut candidates, &index)?
    };
    let selection = selection_of(&candidates);
    let applied = import_candidates(&mut target, &candidates, &selection, session.tolerance())?;
    let changes = applied.change_set();
    reporter.report(&changes);

    Ok(ImportSummary {
        tiles: fetched.tiles.len(),
        failed_tiles,
        conflation,
        net_new: changes.net_new_count(),
        changes,
        description: applied.description(),
    })
}

/// Load a GeoJSON feature collection as permanent reference data.
pub(crate) fn load_reference(path: &Utf8Path) -> Result<Dataset, CliError> {
    let body = std::fs::read_to_string(path.as_std_path()).map_err(|source| {
        CliError::ReadReference {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let features = parse_feature_collection(&body).map_err(|source| CliError::ParseReference {
        path: path.to_path_buf(),
        source,
    })?;
    let mut builder = DatasetBuilder::new(IdentitySpace::Permanent);
    builder.extend(features)?;
    let dataset = builder.build();
    log::info!(
        "loaded {} node(s) and {} way(s) from {path}",
        dataset.node_count(),
        dataset.way_count()
    );
    Ok(dataset)
}

pub(crate) fn write_summary(writer: &mut dyn Write, summary: &ImportSummary) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(summary).map_err(CliError::SerialiseSummary)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteSummary)?;
    writer.write_all(b"\n").map_err(CliError::WriteSummary)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ImportConfig, CliError> {
    let merged = ImportArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ImportConfig::try_from(merged)
}
