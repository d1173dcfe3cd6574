//! Tracker Store Port - Interface for persisting conversation event logs.
//!
//! Only the event log is stored. Trackers are rebuilt by replaying it, so a
//! store never needs to understand derived state.

use async_trait::async_trait;

use crate::domain::dialogue::Event;
use crate::domain::foundation::{DomainError, SenderId};

/// Port for event log persistence.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Replace the stored log for a sender.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` or `SerializationError` if the write fails.
    async fn save(&self, sender_id: &SenderId, events: &[Event]) -> Result<(), DomainError>;

    /// Load the stored log, or `None` for an unknown sender.
    async fn load(&self, sender_id: &SenderId) -> Result<Option<Vec<Event>>, DomainError>;

    /// All senders with a stored log.
    async fn keys(&self) -> Result<Vec<SenderId>, DomainError>;
}
