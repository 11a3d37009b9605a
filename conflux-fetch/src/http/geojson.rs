//! Decoding of GeoJSON `FeatureCollection` documents into [`Feature`]s.
//!
//! Only the parts needed for conflation are read: `Point`, `LineString`, and
//! `MultiLineString` geometries plus the property map. Other geometry types
//! and features with malformed coordinates are skipped.

use conflux_core::{Feature, FeatureGeometry, SourceError, Tags};
use geo::Coord;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// Parse a GeoJSON `FeatureCollection`.
///
/// Property values become tag strings: strings are kept, numbers and
/// booleans are rendered, `null` drops the key, and arrays or objects are
/// kept as compact JSON.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] when the document is not a feature
/// collection.
///
/// # Examples
///
/// ```
/// use conflux_fetch::http::parse_feature_collection;
///
/// let body = r#"{"type":"FeatureCollection","features":[
///     {"type":"Feature",
///      "geometry":{"type":"LineString","coordinates":[[0.0,0.0],[0.0,0.001]]},
///      "properties":{"highway":"service","lanes":1}}]}"#;
/// let features = parse_feature_collection(body)?;
/// assert_eq!(features[0].tags["lanes"], "1");
/// # Ok::<(), conflux_core::SourceError>(())
/// ```
pub fn parse_feature_collection(body: &str) -> Result<Vec<Feature>, SourceError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|err| SourceError::Parse {
            message: err.to_string(),
        })?;
    Ok(collection
        .features
        .into_iter()
        .filter_map(convert_feature)
        .collect())
}

fn convert_feature(raw: RawFeature) -> Option<Feature> {
    let geometry = raw.geometry?;
    let converted = match geometry.kind.as_str() {
        "Point" => position(geometry.coordinates).map(FeatureGeometry::Point),
        "LineString" => line(geometry.coordinates).map(FeatureGeometry::LineString),
        "MultiLineString" => serde_json::from_value::<Vec<Value>>(geometry.coordinates)
            .ok()
            .and_then(|lines| lines.into_iter().map(line).collect::<Option<Vec<_>>>())
            .map(FeatureGeometry::MultiLineString),
        other => {
            log::debug!("skipping unsupported {other} geometry");
            return None;
        }
    };
    let Some(shape) = converted else {
        log::warn!("skipping {} feature with malformed coordinates", geometry.kind);
        return None;
    };
    Some(Feature {
        geometry: shape,
        tags: raw.properties.map(tags_from_properties).unwrap_or_default(),
    })
}

fn position(value: Value) -> Option<Coord<f64>> {
    let numbers: Vec<f64> = serde_json::from_value(value).ok()?;
    match numbers.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn line(value: Value) -> Option<Vec<Coord<f64>>> {
    let positions: Vec<Value> = serde_json::from_value(value).ok()?;
    positions.into_iter().map(position).collect()
}

fn tags_from_properties(properties: Map<String, Value>) -> Tags {
    properties
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(text) => text,
                Value::Bool(flag) => flag.to_string(),
                Value::Number(number) => number.to_string(),
                nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
            };
            Some((key, text))
        })
        .collect()
}
