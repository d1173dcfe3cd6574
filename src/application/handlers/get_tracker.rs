//! GetTracker query handler.
//!
//! Returns a read-only view of a conversation. Live sessions are read in
//! place; anything else is replayed from the tracker store without opening
//! a session.

use std::sync::Arc;

use crate::application::SessionManager;
use crate::domain::dialogue::{DialogueStateTracker, TrackerSnapshot};
use crate::domain::foundation::{DomainError, SenderId};

/// Query for one sender's conversation.
#[derive(Debug, Clone)]
pub struct GetTrackerQuery {
    pub sender: SenderId,
}

impl GetTrackerQuery {
    pub fn new(sender: SenderId) -> Self {
        Self { sender }
    }
}

pub struct GetTrackerHandler {
    sessions: Arc<SessionManager>,
}

impl GetTrackerHandler {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Returns `None` for a sender with no live session and no stored log.
    pub async fn handle(&self, query: GetTrackerQuery) -> Result<Option<TrackerSnapshot>, DomainError> {
        if let Some(session) = self.sessions.get(&query.sender).await {
            return Ok(Some(session.snapshot().await));
        }

        let Some(events) = self.sessions.store().load(&query.sender).await? else {
            return Ok(None);
        };
        let tracker = DialogueStateTracker::replay(query.sender, self.sessions.domain().clone(), events)?;
        Ok(Some(tracker.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTrackerStore;
    use crate::domain::dialogue::{Domain, Event};
    use crate::ports::TrackerStore;

    fn handler() -> (GetTrackerHandler, Arc<SessionManager>, Arc<InMemoryTrackerStore>) {
        let store = Arc::new(InMemoryTrackerStore::new());
        let domain = Arc::new(Domain::builder().build().unwrap());
        let sessions = Arc::new(SessionManager::new(domain, store.clone()));
        (GetTrackerHandler::new(sessions.clone()), sessions, store)
    }

    fn sender(id: &str) -> SenderId {
        SenderId::new(id).unwrap()
    }

    #[tokio::test]
    async fn unknown_sender_is_none() {
        let (handler, _, _) = handler();
        assert!(handler.handle(GetTrackerQuery::new(sender("nobody"))).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_log_is_replayed_without_opening_a_session() {
        let (handler, sessions, store) = handler();
        store.save(&sender("u1"), &[Event::paused()]).await.unwrap();

        let snapshot = handler.handle(GetTrackerQuery::new(sender("u1"))).await.unwrap().unwrap();

        assert!(snapshot.is_paused());
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn live_session_is_read_in_place() {
        let (handler, sessions, _) = handler();
        let session = sessions.get_or_create(&sender("u1")).await.unwrap();
        session.tracker().write().await.append(Event::paused()).unwrap();

        let snapshot = handler.handle(GetTrackerQuery::new(sender("u1"))).await.unwrap().unwrap();
        assert_eq!(snapshot.events().len(), 1);
    }
}
