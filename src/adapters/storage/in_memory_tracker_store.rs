//! In-Memory Tracker Store Adapter
//!
//! Keeps event logs in memory. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::dialogue::Event;
use crate::domain::foundation::{DomainError, SenderId};
use crate::ports::TrackerStore;

/// In-memory storage for event logs
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrackerStore {
    logs: Arc<RwLock<HashMap<SenderId, Vec<Event>>>>,
}

impl InMemoryTrackerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored logs (useful for tests)
    pub async fn clear(&self) {
        self.logs.write().await.clear();
    }

    /// Number of stored logs
    pub async fn len(&self) -> usize {
        self.logs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.logs.read().await.is_empty()
    }
}

#[async_trait]
impl TrackerStore for InMemoryTrackerStore {
    async fn save(&self, sender_id: &SenderId, events: &[Event]) -> Result<(), DomainError> {
        self.logs.write().await.insert(sender_id.clone(), events.to_vec());
        Ok(())
    }

    async fn load(&self, sender_id: &SenderId) -> Result<Option<Vec<Event>>, DomainError> {
        Ok(self.logs.read().await.get(sender_id).cloned())
    }

    async fn keys(&self) -> Result<Vec<SenderId>, DomainError> {
        let mut keys: Vec<SenderId> = self.logs.read().await.keys().cloned().collect();
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(keys)
    }
}
