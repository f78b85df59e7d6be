//! Preference persistence port.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::settings::Preferences;

/// Errors from preference persistence.
#[derive(Debug, Error)]
pub enum PreferenceStoreError {
    /// Storage backend error (filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Store for [`Preferences`].
///
/// Implementations return default preferences when nothing is stored yet.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self) -> Result<Preferences, PreferenceStoreError>;

    async fn save(&self, prefs: &Preferences) -> Result<(), PreferenceStoreError>;
}

/// In-process store. Used when persistence is disabled and in tests.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    inner: Mutex<Preferences>,
}

impl MemoryPreferenceStore {
    #[must_use]
    pub fn new(prefs: Preferences) -> Self {
        Self {
            inner: Mutex::new(prefs),
        }
    }

    /// Copy of the currently stored preferences.
    pub fn snapshot(&self) -> Preferences {
        self.inner
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Result<Preferences, PreferenceStoreError> {
        Ok(self.snapshot())
    }

    async fn save(&self, prefs: &Preferences) -> Result<(), PreferenceStoreError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| PreferenceStoreError::Storage("preference lock poisoned".into()))?;
        *guard = prefs.clone();
        Ok(())
    }
}
