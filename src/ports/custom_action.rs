//! Custom Action Port - Interface for developer-defined actions.
//!
//! Custom actions are the only place side effects happen during a turn
//! (database lookups, API calls). A handler receives an immutable snapshot
//! of the conversation and returns the events it wants recorded. The events
//! are validated and appended by the turn handler; a handler never touches
//! the live tracker.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct GreetByName;
//!
//! #[async_trait]
//! impl CustomActionHandler for GreetByName {
//!     async fn run(&self, ctx: ActionContext) -> Result<Vec<Event>, ActionError> {
//!         let name = ctx.slot_str("name").unwrap_or("there");
//!         Ok(vec![Event::bot_uttered(format!("Hello, {}!", name))])
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::dialogue::{Event, SlotStore, TrackerSnapshot};
use crate::domain::foundation::SenderId;

/// Port for a custom action implementation.
#[async_trait]
pub trait CustomActionHandler: Send + Sync {
    /// Run the action and return the events to append.
    async fn run(&self, ctx: ActionContext) -> Result<Vec<Event>, ActionError>;
}

/// Read-only context handed to a custom action.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub sender_id: SenderId,
    pub action_name: String,
    /// The conversation as it was when the action was dispatched.
    pub tracker: TrackerSnapshot,
    /// A private copy of the slot store; changes are not recorded.
    pub slots: SlotStore,
}

impl ActionContext {
    pub fn new(action_name: impl Into<String>, tracker: TrackerSnapshot) -> Self {
        Self {
            sender_id: tracker.sender_id().clone(),
            action_name: action_name.into(),
            slots: tracker.slot_store().clone(),
            tracker,
        }
    }

    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).filter(|v| !v.is_null())
    }

    pub fn slot_str(&self, name: &str) -> Option<&str> {
        self.slot(name).and_then(Value::as_str)
    }
}

/// Failure reported by a custom action handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// An external dependency failed.
    #[error("external service failed: {0}")]
    External(String),

    /// The conversation is missing something the action needs.
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("{0}")]
    Other(String),
}
