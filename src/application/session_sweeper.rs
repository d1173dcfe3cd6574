//! SessionSweeper - Background service that evicts idle sessions.
//!
//! Evicted sessions lose nothing: a session whose log is not fully stored is
//! saved before it is dropped, and kept in memory if that save fails. The
//! next message replays the log from the tracker store.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 60s | How often to sweep |
//! | `idle_timeout` | 30min | Inactivity before a session is evicted |
//!
//! ## Graceful Shutdown
//!
//! On shutdown the sweeper flushes every live session to the store and stops.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::{DomainError, Timestamp};

use super::SessionManager;

/// Configuration for the SessionSweeper service.
#[derive(Debug, Clone)]
pub struct SessionSweeperConfig {
    pub interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for SessionSweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl SessionSweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

pub struct SessionSweeper {
    sessions: Arc<SessionManager>,
    config: SessionSweeperConfig,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self::with_config(sessions, SessionSweeperConfig::default())
    }

    pub fn with_config(sessions: Arc<SessionManager>, config: SessionSweeperConfig) -> Self {
        Self { sessions, config }
    }

    /// Run the sweep loop until the shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), DomainError> {
        let mut interval = time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        let flushed = self.sessions.flush_all().await?;
                        tracing::info!(flushed, "Session sweeper stopped");
                        return Ok(());
                    }
                }

                _ = interval.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Run exactly one sweep. Returns the number of sessions evicted.
    pub async fn sweep_once(&self) -> usize {
        let evicted = self
            .sessions
            .evict_idle(Timestamp::now(), self.config.idle_timeout)
            .await;
        if evicted > 0 {
            tracing::info!(evicted, "Evicted idle sessions");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTrackerStore;
    use crate::domain::dialogue::{Domain, Event};
    use crate::domain::foundation::SenderId;
    use crate::ports::TrackerStore;

    fn manager(store: Arc<InMemoryTrackerStore>) -> Arc<SessionManager> {
        let domain = Arc::new(Domain::builder().build().unwrap());
        Arc::new(SessionManager::new(domain, store))
    }

    fn sender(id: &str) -> SenderId {
        SenderId::new(id).unwrap()
    }

    #[tokio::test]
    async fn sweep_once_evicts_idle_sessions() {
        let sessions = manager(Arc::new(InMemoryTrackerStore::new()));
        let session = sessions.get_or_create(&sender("u1")).await.unwrap();
        session.touch_at(Timestamp::now().minus_secs(3600));
        drop(session);

        let sweeper = SessionSweeper::new(sessions.clone());

        assert_eq!(sweeper.sweep_once().await, 1);
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn sweep_once_keeps_active_sessions() {
        let sessions = manager(Arc::new(InMemoryTrackerStore::new()));
        sessions.get_or_create(&sender("u1")).await.unwrap().touch();

        let sweeper = SessionSweeper::new(sessions.clone());

        assert_eq!(sweeper.sweep_once().await, 0);
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn run_flushes_on_shutdown() {
        let store = Arc::new(InMemoryTrackerStore::new());
        let sessions = manager(store.clone());
        let session = sessions.get_or_create(&sender("u1")).await.unwrap();
        session
            .tracker()
            .write()
            .await
            .append(Event::paused())
            .unwrap();
        drop(session);

        let sweeper = SessionSweeper::with_config(
            sessions,
            SessionSweeperConfig::default().with_interval(Duration::from_millis(10)),
        );
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { sweeper.run(rx).await });
        time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        handle.await.unwrap().unwrap();
        assert_eq!(store.load(&sender("u1")).await.unwrap().unwrap().len(), 1);
    }
}
