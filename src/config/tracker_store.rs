//! Tracker store configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Which tracker store backend to use
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackerStoreBackend {
    #[default]
    Memory,
    File,
}

/// Tracker store configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TrackerStoreConfig {
    #[serde(default)]
    pub backend: TrackerStoreBackend,

    /// Directory for the file backend
    pub path: Option<PathBuf>,
}

impl TrackerStoreConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backend == TrackerStoreBackend::File && self.path.is_none() {
            return Err(ValidationError::MissingRequired("tracker_store.path"));
        }
        Ok(())
    }
}
