//! HTTP-backed `GeometrySource` for GeoJSON tile services.

use std::time::Duration;

use conflux_core::{BoundingBox, Feature, GeometrySource, SourceError};
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use super::geojson::parse_feature_collection;

/// Placeholder replaced by `min_lon,min_lat,max_lon,max_lat` in URL templates.
pub const BBOX_PLACEHOLDER: &str = "{bbox}";

/// Default user agent for tile requests.
pub const DEFAULT_USER_AGENT: &str = "conflux-fetch/0.1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error type for [`HttpGeometrySource`] construction failures.
#[derive(Debug, Error)]
pub enum SourceBuildError {
    /// The URL template lacks the placeholder or is not a valid URL.
    #[error("invalid URL template {template:?}: {reason}")]
    InvalidTemplate {
        /// Offending template.
        template: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Configuration for [`HttpGeometrySource`].
#[derive(Debug, Clone)]
pub struct HttpGeometrySourceConfig {
    /// URL containing [`BBOX_PLACEHOLDER`], e.g.
    /// `"https://tiles.example.org/roads.geojson?bbox={bbox}"`.
    pub url_template: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpGeometrySourceConfig {
    fn default() -> Self {
        Self {
            url_template: format!("http://localhost:8080/features?bbox={BBOX_PLACEHOLDER}"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpGeometrySourceConfig {
    /// Create a configuration for the given URL template.
    #[must_use]
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Fetches candidate geometry from a GeoJSON tile service.
///
/// Implements the synchronous [`GeometrySource`] trait by blocking on an
/// owned multi-threaded Tokio runtime, so several orchestrator workers may
/// fetch through one source at once. Inside a caller's multi-threaded
/// runtime the caller's handle is used with
/// [`tokio::task::block_in_place`] instead.
pub struct HttpGeometrySource {
    client: Client,
    config: HttpGeometrySourceConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpGeometrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGeometrySource")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpGeometrySource {
    /// Create a source with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid or the HTTP client or
    /// Tokio runtime fails to build.
    pub fn new(url_template: impl Into<String>) -> Result<Self, SourceBuildError> {
        Self::with_config(HttpGeometrySourceConfig::new(url_template))
    }

    /// Create a source with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid or the HTTP client or
    /// Tokio runtime fails to build.
    pub fn with_config(config: HttpGeometrySourceConfig) -> Result<Self, SourceBuildError> {
        validate_template(&config.url_template)?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(SourceBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(SourceBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpGeometrySourceConfig {
        &self.config
    }

    fn build_url(&self, bbox: &BoundingBox) -> String {
        self.config
            .url_template
            .replace(BBOX_PLACEHOLDER, &bbox.to_query_string())
    }

    async fn fetch_async(&self, bbox: &BoundingBox) -> Result<Vec<Feature>, SourceError> {
        let url = self.build_url(bbox);
        log::debug!("requesting {url}");
        let body = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;
        parse_feature_collection(&body)
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> SourceError {
        if error.is_timeout() {
            return SourceError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return SourceError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        SourceError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

fn validate_template(template: &str) -> Result<(), SourceBuildError> {
    let invalid = |reason: String| SourceBuildError::InvalidTemplate {
        template: template.to_owned(),
        reason,
    };
    if !template.contains(BBOX_PLACEHOLDER) {
        return Err(invalid(format!("missing {BBOX_PLACEHOLDER} placeholder")));
    }
    let sample = template.replace(BBOX_PLACEHOLDER, "0,0,0,0");
    let url = Url::parse(&sample).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

impl GeometrySource for HttpGeometrySource {
    /// Fetch the features intersecting `bbox`.
    ///
    /// Inside a `current_thread` Tokio runtime the source falls back to its
    /// own runtime, which blocks the caller's runtime for the duration.
    fn fetch(&self, bbox: &BoundingBox) -> Result<Vec<Feature>, SourceError> {
        let future = self.fetch_async(bbox);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}
