//! GeoJSON tile services as a [`GeometrySource`](conflux_core::GeometrySource).
//!
//! [`HttpGeometrySource`] substitutes each tile's bounding box into a URL
//! template and parses the returned `FeatureCollection`. The source trait is
//! synchronous, so the provider blocks on its own Tokio runtime.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use conflux_core::{BoundingBox, GeometrySource};
//! use conflux_fetch::http::{HttpGeometrySource, HttpGeometrySourceConfig};
//!
//! let config = HttpGeometrySourceConfig::new("https://tiles.example.org/roads?bbox={bbox}")
//!     .with_timeout(Duration::from_secs(60));
//! let source = HttpGeometrySource::with_config(config)?;
//! let features = source.fetch(&BoundingBox::new(13.40, 52.50, 13.41, 52.51)?)?;
//! println!("{} feature(s)", features.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod geojson;
mod provider;

pub use geojson::parse_feature_collection;
pub use provider::{
    BBOX_PLACEHOLDER, DEFAULT_USER_AGENT, HttpGeometrySource, HttpGeometrySourceConfig,
    SourceBuildError,
};
