//! Remote geometry sources queried per bounding box.

use thiserror::Error;

use crate::{BoundingBox, Feature};

/// Errors from [`GeometrySource::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The service answered with a non-success status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The request did not complete.
    #[error("network error requesting {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Error description.
        message: String,
    },
    /// The request exceeded its deadline.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response: {message}")]
    Parse {
        /// Error description.
        message: String,
    },
    /// The source refused the request for any other reason.
    #[error("geometry source unavailable: {message}")]
    Unavailable {
        /// Error description.
        message: String,
    },
}

/// Supply candidate features for a bounding box.
///
/// The trait is synchronous so the orchestrator can drive it from plain
/// worker threads. Implementations must be safe to call concurrently.
///
/// # Examples
///
/// ```
/// use conflux_core::{BoundingBox, Feature, GeometrySource, SourceError};
///
/// struct Empty;
///
/// impl GeometrySource for Empty {
///     fn fetch(&self, _bbox: &BoundingBox) -> Result<Vec<Feature>, SourceError> {
///         Ok(Vec::new())
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bbox: BoundingBox = "0,0,1,1".parse()?;
/// assert!(Empty.fetch(&bbox)?.is_empty());
/// # Ok(())
/// # }
/// ```
pub trait GeometrySource: Send + Sync {
    /// Return every feature intersecting `bbox`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the features cannot be retrieved.
    fn fetch(&self, bbox: &BoundingBox) -> Result<Vec<Feature>, SourceError>;
}

impl<S: GeometrySource + ?Sized> GeometrySource for &S {
    fn fetch(&self, bbox: &BoundingBox) -> Result<Vec<Feature>, SourceError> {
        (**self).fetch(bbox)
    }
}

impl<S: GeometrySource + ?Sized> GeometrySource for Box<S> {
    fn fetch(&self, bbox: &BoundingBox) -> Result<Vec<Feature>, SourceError> {
        (**self).fetch(bbox)
    }
}
