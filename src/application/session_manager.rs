//! SessionManager - live conversations keyed by sender.
//!
//! Each session owns a turn gate, a tracker lock and a persistence gate. The
//! turn gate serializes whole turns for one sender; the tracker lock is held
//! only for reads and appends, so a slow custom action never blocks a
//! snapshot. The persistence gate orders saves for one sender and remembers
//! how much of the log the store holds, so a session is never evicted with
//! unsaved events. Different senders only meet on the session map lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::domain::dialogue::{DialogueStateTracker, Domain, TrackerSnapshot};
use crate::domain::foundation::{DomainError, SenderId, SessionId, Timestamp};
use crate::ports::TrackerStore;

/// What happens when a message arrives while a turn for the same sender is
/// still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Queue behind the running turn.
    #[default]
    Wait,
    /// Fail immediately with `SessionBusy`.
    Reject,
}

/// One live conversation.
#[derive(Debug)]
pub struct Session {
    sender_id: SenderId,
    session_id: SessionId,
    turn_gate: Mutex<()>,
    tracker: RwLock<DialogueStateTracker>,
    /// Sequence of the log last written to the store.
    persisted: Mutex<u64>,
    last_active: StdMutex<Timestamp>,
}

impl Session {
    /// Wraps a tracker whose whole log is already in the store (replayed
    /// from it, or empty).
    pub fn new(tracker: DialogueStateTracker) -> Self {
        Self {
            sender_id: tracker.sender_id().clone(),
            session_id: SessionId::new(),
            turn_gate: Mutex::new(()),
            persisted: Mutex::new(tracker.sequence()),
            tracker: RwLock::new(tracker),
            last_active: StdMutex::new(Timestamp::now()),
        }
    }

    pub fn sender_id(&self) -> &SenderId {
        &self.sender_id
    }

    /// Identifies this in-memory incarnation; a reloaded session gets a new one.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Enters the turn gate. `None` means the gate is taken and the policy
    /// is `Reject`.
    pub async fn acquire_turn(&self, policy: BusyPolicy) -> Option<MutexGuard<'_, ()>> {
        match policy {
            BusyPolicy::Wait => Some(self.turn_gate.lock().await),
            BusyPolicy::Reject => self.turn_gate.try_lock().ok(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.turn_gate.try_lock().is_err()
    }

    pub fn tracker(&self) -> &RwLock<DialogueStateTracker> {
        &self.tracker
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        self.tracker.read().await.snapshot()
    }

    /// Writes the log to `store` unless the store already holds it. Returns
    /// true if a save happened.
    ///
    /// The log is copied and saved under the persistence gate, so a save
    /// never overwrites a longer log written by a concurrent caller.
    pub async fn persist(&self, store: &dyn TrackerStore) -> Result<bool, DomainError> {
        let mut persisted = self.persisted.lock().await;
        let (sequence, events) = {
            let tracker = self.tracker.read().await;
            (tracker.sequence(), tracker.events().to_vec())
        };
        if sequence <= *persisted {
            return Ok(false);
        }

        store.save(&self.sender_id, &events).await?;
        *persisted = sequence;
        Ok(true)
    }

    /// True when the store holds the whole log. False while a save or an
    /// append is in progress.
    fn is_saved(&self) -> bool {
        match (self.persisted.try_lock(), self.tracker.try_read()) {
            (Ok(persisted), Ok(tracker)) => tracker.sequence() <= *persisted,
            _ => false,
        }
    }

    pub fn touch(&self) {
        self.touch_at(Timestamp::now());
    }

    pub fn touch_at(&self, at: Timestamp) {
        if let Ok(mut last) = self.last_active.lock() {
            *last = at;
        }
    }

    pub fn last_active(&self) -> Timestamp {
        self.last_active.lock().map(|t| *t).unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    fn idle_since(&self, now: &Timestamp, timeout: Duration) -> bool {
        now.duration_since(&self.last_active())
            .to_std()
            .map(|idle| idle >= timeout)
            .unwrap_or(false)
    }
}

pub struct SessionManager {
    sessions: RwLock<HashMap<SenderId, Arc<Session>>>,
    domain: Arc<Domain>,
    store: Arc<dyn TrackerStore>,
}

impl SessionManager {
    pub fn new(domain: Arc<Domain>, store: Arc<dyn TrackerStore>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            domain,
            store,
        }
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    pub fn store(&self) -> &Arc<dyn TrackerStore> {
        &self.store
    }

    /// Returns the live session for `sender`, replaying its stored log into
    /// a new tracker if it is not in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the stored log no longer
    /// replays against the domain.
    pub async fn get_or_create(&self, sender: &SenderId) -> Result<Arc<Session>, DomainError> {
        if let Some(session) = self.get(sender).await {
            return Ok(session);
        }

        // Replay without holding the map lock; a concurrent creator may win.
        let tracker = self.load_tracker(sender).await?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(sender.clone())
            .or_insert_with(|| {
                tracing::debug!(sender = %sender, "Session opened");
                Arc::new(Session::new(tracker))
            })
            .clone();
        Ok(session)
    }

    pub async fn get(&self, sender: &SenderId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(sender).cloned()
    }

    /// Rebuilds a tracker from the store, or starts an empty one.
    pub async fn load_tracker(&self, sender: &SenderId) -> Result<DialogueStateTracker, DomainError> {
        match self.store.load(sender).await? {
            Some(events) => DialogueStateTracker::replay(sender.clone(), self.domain.clone(), events)
                .map_err(DomainError::from),
            None => Ok(DialogueStateTracker::new(sender.clone(), self.domain.clone())),
        }
    }

    /// Writes the session's log to the store unless it is already there.
    pub async fn persist(&self, session: &Session) -> Result<bool, DomainError> {
        session.persist(self.store.as_ref()).await
    }

    /// Drops sessions idle for at least `timeout`. Idle sessions with
    /// unsaved events are saved first; if that fails they stay in memory.
    /// A session with a turn in flight or a handle held elsewhere is kept.
    /// Returns the number evicted.
    pub async fn evict_idle(&self, now: Timestamp, timeout: Duration) -> usize {
        let idle: Vec<Arc<Session>> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|session| session.idle_since(&now, timeout))
            .cloned()
            .collect();

        for session in &idle {
            if let Err(e) = self.persist(session).await {
                tracing::warn!(sender = %session.sender_id(), error = %e, "Keeping idle session with unsaved events");
            }
        }
        drop(idle);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|sender, session| {
            let evictable = session.idle_since(&now, timeout)
                && Arc::strong_count(session) == 1
                && !session.is_busy()
                && session.is_saved();
            if evictable {
                tracing::debug!(sender = %sender, "Session evicted");
            }
            !evictable
        });

        before - sessions.len()
    }

    /// Saves every live session with unsaved events. Returns the number
    /// written.
    pub async fn flush_all(&self) -> Result<usize, DomainError> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();

        let results = join_all(sessions.iter().map(|session| self.persist(session))).await;

        let mut written = 0;
        for result in results {
            if result? {
                written += 1;
            }
        }
        Ok(written)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
