//! JSON file preference store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use readaloud_core::{PreferenceStore, PreferenceStoreError, Preferences, validate_preferences};

/// Preferences persisted as one pretty-printed JSON document.
///
/// A missing file loads as defaults. Saves go through a sibling temp file and
/// a rename so a crash never leaves a half-written document behind.
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PreferenceStore for JsonPreferenceStore {
    async fn load(&self) -> Result<Preferences, PreferenceStoreError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No preferences file yet");
                return Ok(Preferences::default());
            }
            Err(e) => return Err(PreferenceStoreError::Storage(e.to_string())),
        };

        let prefs: Preferences = serde_json::from_str(&json)
            .map_err(|e| PreferenceStoreError::Serialization(e.to_string()))?;
        validate_preferences(&prefs)
            .map_err(|e| PreferenceStoreError::Serialization(e.to_string()))?;
        Ok(prefs)
    }

    async fn save(&self, prefs: &Preferences) -> Result<(), PreferenceStoreError> {
        let json = serde_json::to_string_pretty(prefs)
            .map_err(|e| PreferenceStoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PreferenceStoreError::Storage(e.to_string()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| PreferenceStoreError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PreferenceStoreError::Storage(e.to_string()))?;

        tracing::debug!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}
