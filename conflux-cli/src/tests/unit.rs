//! Focused unit tests covering import configuration and logging options.

use super::helpers::{REGION, ReferenceFile, import_args};
use super::*;
use crate::import::{ImportConfig, config_from_layers_for_test, load_reference, parse_tag_rules};
use crate::logging::normalise_level;
use conflux_core::{Tag, TagMapping, Tolerance};
use conflux_fetch::FetchConfig;
use rstest::rstest;

#[rstest]
fn converting_import_without_bbox_errors() {
    let args = ImportArgs {
        source_url: Some("https://tiles.invalid/roads?bbox={bbox}".to_owned()),
        ..ImportArgs::default()
    };

    let err = ImportConfig::try_from(args).expect_err("missing bbox should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_BBOX);
            assert_eq!(env, ENV_BBOX);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn converting_import_without_source_url_errors() {
    let args = ImportArgs {
        bbox: Some(REGION.to_owned()),
        ..ImportArgs::default()
    };

    let err = ImportConfig::try_from(args).expect_err("missing source url should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_SOURCE_URL);
            assert_eq!(env, ENV_SOURCE_URL);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn import_config_applies_defaults() {
    let reference = ReferenceFile::street();
    let config = ImportConfig::try_from(import_args(&reference)).expect("config should build");

    assert_eq!(config.region, REGION.parse().expect("region parses"));
    assert_eq!(config.fetch, FetchConfig::default());
    assert_eq!(config.tolerance, Tolerance::default());
    assert!(config.tag_mapping.is_empty());
    assert_eq!(config.output, None);
    assert_eq!(config.reference.as_ref(), Some(reference.path()));
}

#[rstest]
fn import_config_applies_overrides() {
    let reference = ReferenceFile::street();
    let args = ImportArgs {
        max_tile_side: Some(500.0),
        workers: Some(2),
        snap_distance: Some(1.5),
        max_angle: Some(20.0),
        ..import_args(&reference)
    };

    let config = ImportConfig::try_from(args).expect("config should build");
    assert_eq!(config.fetch, FetchConfig::default().with_max_tile_side_m(500.0).with_max_workers(2));
    assert_eq!(
        config.tolerance,
        Tolerance::default()
            .with_snap_distance_m(1.5)
            .with_max_angle_deg(20.0)
    );
}

#[rstest]
#[case::lat_out_of_range("0,-91,1,1")]
#[case::not_finite("0,inf,1,1")]
#[case::too_few_parts("0,0,1")]
#[case::not_numeric("a,b,c,d")]
fn invalid_bbox_is_rejected(#[case] input: &str) {
    let reference = ReferenceFile::street();
    let args = ImportArgs {
        bbox: Some(input.to_owned()),
        ..import_args(&reference)
    };

    match ImportConfig::try_from(args).expect_err("bbox should be rejected") {
        CliError::InvalidBoundingBox { field, input: seen, .. } => {
            assert_eq!(field, ARG_BBOX);
            assert_eq!(seen, input);
        }
        other => panic!("expected InvalidBoundingBox, found {other:?}"),
    }
}

#[rstest]
#[case::zero_workers(ARG_WORKERS, ImportArgs { workers: Some(0), ..ImportArgs::default() })]
#[case::negative_snap(ARG_SNAP_DISTANCE, ImportArgs { snap_distance: Some(-1.0), ..ImportArgs::default() })]
#[case::zero_tile(ARG_MAX_TILE_SIDE, ImportArgs { max_tile_side: Some(0.0), ..ImportArgs::default() })]
#[case::wide_angle(ARG_MAX_ANGLE, ImportArgs { max_angle: Some(120.0), ..ImportArgs::default() })]
fn out_of_range_options_are_rejected(#[case] expected: &'static str, #[case] overrides: ImportArgs) {
    let reference = ReferenceFile::street();
    let args = ImportArgs {
        bbox: Some(REGION.to_owned()),
        source_url: Some("https://tiles.invalid/roads?bbox={bbox}".to_owned()),
        reference: Some(reference.path().clone()),
        ..overrides
    };

    match ImportConfig::try_from(args).expect_err("option should be rejected") {
        CliError::InvalidOption { field, .. } => assert_eq!(field, expected),
        other => panic!("expected InvalidOption, found {other:?}"),
    }
}

#[rstest]
fn tag_rules_parse_in_order() {
    let mapping = parse_tag_rules("highway=footpath=>highway=footway; fixme=> ;;source=>source:geometry")
        .expect("rules parse");
    let expected = TagMapping::new()
        .with_rule(Tag::new("highway", "footpath"), Tag::new("highway", "footway"))
        .with_rule(Tag::any("fixme"), Tag::any(""))
        .with_rule(Tag::any("source"), Tag::any("source:geometry"));
    assert_eq!(mapping, expected);
}

#[rstest]
#[case::no_arrow("highway=footway")]
#[case::empty_source("=>highway=footway")]
fn malformed_tag_rules_are_rejected(#[case] rule: &str) {
    match parse_tag_rules(rule).expect_err("rule should be rejected") {
        CliError::InvalidTagRule { rule: seen } => assert_eq!(seen, rule),
        other => panic!("expected InvalidTagRule, found {other:?}"),
    }
}

#[rstest]
#[case("trace", "trace")]
#[case("DEBUG", "debug")]
#[case(" info ", "info")]
#[case("warning", "warn")]
#[case("Error", "error")]
fn log_levels_are_normalised(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(normalise_level(input).expect("level accepted"), expected);
}

#[rstest]
fn unknown_log_level_is_rejected() {
    match normalise_level("verbose").expect_err("level should be rejected") {
        CliError::InvalidLogLevel { level } => assert_eq!(level, "verbose"),
        other => panic!("expected InvalidLogLevel, found {other:?}"),
    }
}

#[rstest]
fn loading_reference_assigns_permanent_ids() {
    let reference = ReferenceFile::street();
    let dataset = load_reference(reference.path()).expect("reference loads");
    assert_eq!(dataset.node_count(), 2);
    assert_eq!(dataset.way_count(), 1);
    assert!(dataset.nodes().all(|node| !node.id.is_local()));
    assert!(!dataset.is_modified());
}

#[rstest]
fn missing_reference_reports_read_error() {
    let reference = ReferenceFile::street();
    let missing = reference.path().with_file_name("absent.geojson");
    match load_reference(&missing).expect_err("missing file should error") {
        CliError::ReadReference { path, .. } => assert_eq!(path, missing),
        other => panic!("expected ReadReference, found {other:?}"),
    }
}

#[rstest]
fn malformed_reference_reports_parse_error() {
    let reference = ReferenceFile::with_contents("[1, 2, 3]");
    match load_reference(reference.path()).expect_err("bad file should error") {
        CliError::ParseReference { path, .. } => assert_eq!(&path, reference.path()),
        other => panic!("expected ParseReference, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "workers": "many" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "bbox": "0,0,1,1",
            "source_url": "https://from-file/",
            "snap_distance": 3.0,
        }),
        None,
    );
    composer.push_environment(json!({
        "source_url": "https://from-env/",
        "workers": 8,
    }));
    composer.push_cli(json!({ "bbox": REGION }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.region, REGION.parse().expect("region parses"));
    assert_eq!(config.source_url, "https://from-env/");
    assert_eq!(config.fetch.max_workers, 8);
    assert_eq!(config.tolerance.snap_distance_m, 3.0);
}
