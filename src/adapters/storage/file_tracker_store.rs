//! File-based Tracker Store Adapter
//!
//! Stores each sender's event log as a YAML file on disk, one file per
//! sender. File names are the sender id with every byte outside
//! `[A-Za-z0-9_-]` escaped as `%XX`, so any sender id maps to a safe and
//! reversible name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::dialogue::Event;
use crate::domain::foundation::{DomainError, SenderId};
use crate::ports::TrackerStore;

const EXTENSION: &str = "yaml";

#[derive(Debug, Serialize, Deserialize)]
struct StoredLog {
    sender_id: SenderId,
    events: Vec<Event>,
}

/// File-based storage for event logs
#[derive(Debug, Clone)]
pub struct FileTrackerStore {
    base_path: PathBuf,
}

impl FileTrackerStore {
    /// Create a store rooted at `base_path`. The directory is created on the
    /// first save.
    ///
    /// # Example
    /// ```ignore
    /// let store = FileTrackerStore::new("./data/trackers");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn log_path(&self, sender_id: &SenderId) -> PathBuf {
        self.base_path
            .join(format!("{}.{}", encode_file_stem(sender_id.as_str()), EXTENSION))
    }
}

fn encode_file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_file_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl TrackerStore for FileTrackerStore {
    async fn save(&self, sender_id: &SenderId, events: &[Event]) -> Result<(), DomainError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| DomainError::storage(format!("create {}: {}", self.base_path.display(), e)))?;

        let log = StoredLog {
            sender_id: sender_id.clone(),
            events: events.to_vec(),
        };
        let yaml = serde_yaml::to_string(&log).map_err(|e| DomainError::serialization(e.to_string()))?;

        // Write then rename; readers never see a partial log.
        let path = self.log_path(sender_id);
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml)
            .await
            .map_err(|e| DomainError::storage(format!("write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| DomainError::storage(format!("rename {}: {}", path.display(), e)))?;

        tracing::trace!(sender = %sender_id, events = events.len(), "Tracker saved");
        Ok(())
    }

    async fn load(&self, sender_id: &SenderId) -> Result<Option<Vec<Event>>, DomainError> {
        let path = self.log_path(sender_id);
        let yaml = match fs::read_to_string(&path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DomainError::storage(format!("read {}: {}", path.display(), e))),
        };

        let log: StoredLog = serde_yaml::from_str(&yaml)
            .map_err(|e| DomainError::serialization(format!("{}: {}", path.display(), e)))?;
        Ok(Some(log.events))
    }

    async fn keys(&self) -> Result<Vec<SenderId>, DomainError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "list {}: {}",
                    self.base_path.display(),
                    e
                )))
            }
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match decode_file_stem(stem).map(SenderId::new) {
                Some(Ok(id)) => keys.push(id),
                _ => tracing::warn!(path = %path.display(), "Skipping unrecognized tracker file"),
            }
        }
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(keys)
    }
}
