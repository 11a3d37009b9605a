//! Reference data and geometry sources shared by the CLI tests.

use super::*;
use crate::import::{ImportConfig, SourceBuilder};
use camino::Utf8PathBuf;
use conflux_core::test_support::StaticGeometrySource;
use conflux_core::{Feature, GeometrySource, Tags};
use geo::Coord;
use std::fs;
use tempfile::TempDir;

/// Region covering the reference street and every candidate below.
pub(super) const REGION: &str = "-0.001,-0.001,0.003,0.003";

/// East-west residential street from (0, 0) to (0.002, 0).
const REFERENCE_STREET: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature",
     "geometry":{"type":"LineString","coordinates":[[0.0,0.0],[0.002,0.0]]},
     "properties":{"highway":"residential"}}]}"#;

/// A reference GeoJSON file kept alive for the duration of a test.
pub(super) struct ReferenceFile {
    _dir: TempDir,
    path: Utf8PathBuf,
}

impl ReferenceFile {
    pub(super) fn street() -> Self {
        Self::with_contents(REFERENCE_STREET)
    }

    pub(super) fn with_contents(contents: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("reference.geojson"))
            .expect("utf-8 tempdir");
        fs::write(&path, contents).expect("write reference");
        Self { _dir: dir, path }
    }

    pub(super) fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

/// A footway running north whose southern end sits 2 m off the street.
pub(super) fn spur() -> Feature {
    Feature::line(
        vec![Coord { x: 0.001, y: 0.000_02 }, Coord { x: 0.001, y: 0.001 }],
        tags(&[("highway", "footway")]),
    )
}

/// The reference street as a tile service would return it.
pub(super) fn street_copy() -> Feature {
    Feature::line(
        vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 0.002, y: 0.0 }],
        tags(&[("highway", "residential")]),
    )
}

/// Arguments selecting `reference` and the test region.
pub(super) fn import_args(reference: &ReferenceFile) -> ImportArgs {
    ImportArgs {
        bbox: Some(REGION.to_owned()),
        source_url: Some("https://tiles.invalid/roads?bbox={bbox}".to_owned()),
        reference: Some(reference.path().clone()),
        ..ImportArgs::default()
    }
}

/// Builds a [`StaticGeometrySource`] serving a fixed feature list.
pub(super) struct StaticSourceBuilder {
    pub(super) features: Vec<Feature>,
}

impl SourceBuilder for StaticSourceBuilder {
    fn build(&self, _config: &ImportConfig) -> Result<Box<dyn GeometrySource>, CliError> {
        Ok(Box::new(StaticGeometrySource::with_features(
            self.features.clone(),
        )))
    }
}
