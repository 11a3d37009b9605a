use std::sync::{Arc, Mutex, MutexGuard};

use super::{Dataset, DatasetError};

/// A dataset shared between the session and the commands editing it.
///
/// Every mutation happens under the lock, so commands never observe a
/// partially applied edit from another thread.
#[derive(Debug, Clone, Default)]
pub struct SharedDataset(Arc<Mutex<Dataset>>);

impl SharedDataset {
    /// Wrap `dataset` for shared access.
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self(Arc::new(Mutex::new(dataset)))
    }

    /// Acquire exclusive access.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Poisoned`] when a previous holder panicked.
    pub fn lock(&self) -> Result<MutexGuard<'_, Dataset>, DatasetError> {
        self.0.lock().map_err(|_| DatasetError::Poisoned)
    }

    /// Run `f` with exclusive access and return its result.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Poisoned`] when a previous holder panicked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Dataset) -> R) -> Result<R, DatasetError> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }
}
