//! ActionExecutor - runs a selected action against a tracker snapshot.
//!
//! The executor never mutates a tracker. It returns the events the action
//! produced; the turn handler appends them together with the
//! `ActionExecuted` record. A failed action produces no events at all.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::domain::dialogue::{
    render, select_variation, Action, Event, EventKind, TrackerSnapshot, UTTER_DEFAULT,
};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::ActionContext;

use super::ActionRegistry;

/// Default bound on a custom action's run time.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a custom action failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionFailureCause {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("handler returned an error: {0}")]
    Handler(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("no handler registered")]
    UnknownAction,

    #[error("returned invalid events: {0}")]
    InvalidEvents(String),
}

/// A selected action could not be executed. Recovered by falling back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("action '{action_name}' failed: {cause}")]
pub struct ActionExecutionFailed {
    pub action_name: String,
    pub cause: ActionFailureCause,
}

impl ActionExecutionFailed {
    fn new(action_name: &str, cause: ActionFailureCause) -> Self {
        Self {
            action_name: action_name.to_string(),
            cause,
        }
    }
}

impl From<ActionExecutionFailed> for DomainError {
    fn from(err: ActionExecutionFailed) -> Self {
        let code = match err.cause {
            ActionFailureCause::UnknownAction => ErrorCode::UnknownAction,
            _ => ErrorCode::ActionExecutionFailed,
        };
        DomainError::new(code, err.to_string()).with_detail("action", err.action_name)
    }
}

pub struct ActionExecutor {
    registry: Arc<ActionRegistry>,
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `action` and returns the events it produced.
    pub async fn execute(
        &self,
        action: &Action,
        snapshot: &TrackerSnapshot,
    ) -> Result<Vec<Event>, ActionExecutionFailed> {
        match action {
            Action::Listen => Ok(Vec::new()),
            Action::Utter { template_id } => Ok(utter(template_id, snapshot).into_iter().collect()),
            Action::DefaultFallback => Ok(utter(UTTER_DEFAULT, snapshot).into_iter().collect()),
            Action::Restart => Ok(vec![Event::restarted()]),
            Action::SessionStart => Ok(session_start(snapshot)),
            Action::Custom { handler_id } => self.run_custom(handler_id, snapshot).await,
        }
    }

    async fn run_custom(
        &self,
        handler_id: &str,
        snapshot: &TrackerSnapshot,
    ) -> Result<Vec<Event>, ActionExecutionFailed> {
        let handler = self
            .registry
            .get(handler_id)
            .ok_or_else(|| ActionExecutionFailed::new(handler_id, ActionFailureCause::UnknownAction))?;

        let ctx = ActionContext::new(handler_id, snapshot.clone());
        let mut task = tokio::spawn(async move { handler.run(ctx).await });

        let events = match tokio::time::timeout(self.timeout, &mut task).await {
            Err(_) => {
                task.abort();
                return Err(ActionExecutionFailed::new(
                    handler_id,
                    ActionFailureCause::Timeout(self.timeout),
                ));
            }
            Ok(Err(join_error)) => {
                let cause = if join_error.is_panic() {
                    ActionFailureCause::Panicked(panic_message(join_error.into_panic()))
                } else {
                    ActionFailureCause::Handler("task was cancelled".to_string())
                };
                return Err(ActionExecutionFailed::new(handler_id, cause));
            }
            Ok(Ok(Err(e))) => {
                return Err(ActionExecutionFailed::new(
                    handler_id,
                    ActionFailureCause::Handler(e.to_string()),
                ))
            }
            Ok(Ok(Ok(events))) => events,
        };

        self.check_events(handler_id, snapshot, &events)?;
        Ok(events)
    }

    /// Returned events must apply cleanly and name only known actions.
    fn check_events(
        &self,
        handler_id: &str,
        snapshot: &TrackerSnapshot,
        events: &[Event],
    ) -> Result<(), ActionExecutionFailed> {
        let invalid = |reason: String| ActionExecutionFailed::new(handler_id, ActionFailureCause::InvalidEvents(reason));

        for event in events {
            if let EventKind::FollowupAction { name } = &event.kind {
                if snapshot.domain().action_for_name(name).is_none() {
                    return Err(invalid(format!("followup names unknown action '{}'", name)));
                }
            }
        }
        snapshot.check_all(events).map_err(|e| invalid(e.to_string()))
    }
}

fn utter(template_id: &str, snapshot: &TrackerSnapshot) -> Option<Event> {
    let variations = snapshot.domain().response(template_id)?;
    let slots = snapshot.current_slots();
    match select_variation(variations, slots) {
        Some(variation) => Some(Event::bot_uttered_from(render(&variation.text, slots), template_id)),
        None => {
            tracing::warn!(template = template_id, "No response variation applies");
            None
        }
    }
}

/// `SessionStarted`, then the slots carried over from the previous session.
fn session_start(snapshot: &TrackerSnapshot) -> Vec<Event> {
    let mut events = vec![Event::session_started()];
    if snapshot.domain().session_settings().carry_over_slots_to_new_session {
        events.extend(
            snapshot
                .slot_store()
                .changed()
                .map(|(name, value)| Event::slot_set(name.clone(), value.clone())),
        );
    }
    events
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
