//! Tracker events.
//!
//! A conversation is an append-only list of [`Event`]s. Every piece of
//! derived tracker state (slots, latest intent, paused flag, ...) is a fold
//! over this list, so a tracker can always be rebuilt by replay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::nlu::{Entity, Intent, ParsedMessage};
use crate::domain::foundation::Timestamp;

/// An immutable, timestamped record in a conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: Timestamp,
    pub kind: EventKind,
}

/// The payload of an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// The user sent a message.
    UserUttered {
        text: String,
        intent: Option<Intent>,
        #[serde(default)]
        entities: Vec<Entity>,
    },

    /// A slot was assigned a value (`null` unsets it).
    SlotSet { name: String, value: Value },

    /// An action ran. `policy` and `confidence` describe the prediction.
    ActionExecuted {
        name: String,
        #[serde(default)]
        policy: Option<String>,
        #[serde(default)]
        confidence: Option<f64>,
    },

    /// The bot sent a message.
    BotUttered {
        text: String,
        #[serde(default)]
        template: Option<String>,
    },

    /// Conversation restarted; derived state resets, the log is kept.
    Restarted,

    /// A new session began within the same log.
    SessionStarted,

    /// Every slot returns to its initial value.
    AllSlotsReset,

    /// The bot stops responding until resumed.
    ConversationPaused,

    /// The bot responds again.
    ConversationResumed,

    /// Forces the next action to be `name`.
    FollowupAction { name: String },
}

impl Event {
    /// Wraps a kind with the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Timestamp::now(),
            kind,
        }
    }

    /// Wraps a kind with an explicit time (used by replay and tests).
    pub fn at(timestamp: Timestamp, kind: EventKind) -> Self {
        Self { timestamp, kind }
    }

    pub fn user_uttered(text: impl Into<String>, intent: Option<Intent>, entities: Vec<Entity>) -> Self {
        Self::new(EventKind::UserUttered {
            text: text.into(),
            intent,
            entities,
        })
    }

    /// Builds a `UserUttered` event from an interpreter result.
    pub fn from_parse(parsed: &ParsedMessage) -> Self {
        Self::user_uttered(parsed.text.clone(), parsed.intent.clone(), parsed.entities.clone())
    }

    pub fn slot_set(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(EventKind::SlotSet {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn action_executed(name: impl Into<String>) -> Self {
        Self::new(EventKind::ActionExecuted {
            name: name.into(),
            policy: None,
            confidence: None,
        })
    }

    /// An `ActionExecuted` annotated with the prediction that selected it.
    pub fn action_predicted(name: impl Into<String>, policy: impl Into<String>, confidence: f64) -> Self {
        Self::new(EventKind::ActionExecuted {
            name: name.into(),
            policy: Some(policy.into()),
            confidence: Some(confidence),
        })
    }

    pub fn bot_uttered(text: impl Into<String>) -> Self {
        Self::new(EventKind::BotUttered {
            text: text.into(),
            template: None,
        })
    }

    pub fn bot_uttered_from(text: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(EventKind::BotUttered {
            text: text.into(),
            template: Some(template.into()),
        })
    }

    pub fn restarted() -> Self {
        Self::new(EventKind::Restarted)
    }

    pub fn session_started() -> Self {
        Self::new(EventKind::SessionStarted)
    }

    pub fn all_slots_reset() -> Self {
        Self::new(EventKind::AllSlotsReset)
    }

    pub fn paused() -> Self {
        Self::new(EventKind::ConversationPaused)
    }

    pub fn resumed() -> Self {
        Self::new(EventKind::ConversationResumed)
    }

    pub fn followup(name: impl Into<String>) -> Self {
        Self::new(EventKind::FollowupAction { name: name.into() })
    }

    /// Short type name used in logs.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            EventKind::UserUttered { .. } => "user",
            EventKind::SlotSet { .. } => "slot",
            EventKind::ActionExecuted { .. } => "action",
            EventKind::BotUttered { .. } => "bot",
            EventKind::Restarted => "restart",
            EventKind::SessionStarted => "session_started",
            EventKind::AllSlotsReset => "reset_slots",
            EventKind::ConversationPaused => "pause",
            EventKind::ConversationResumed => "resume",
            EventKind::FollowupAction { .. } => "followup",
        }
    }

    /// Returns true if this event resets derived state.
    pub fn starts_episode(&self) -> bool {
        matches!(self.kind, EventKind::Restarted | EventKind::SessionStarted)
    }

    /// The action name, for `ActionExecuted` events.
    pub fn action_name(&self) -> Option<&str> {
        match &self.kind {
            EventKind::ActionExecuted { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The message text, for `BotUttered` events.
    pub fn bot_text(&self) -> Option<&str> {
        match &self.kind {
            EventKind::BotUttered { text, .. } => Some(text),
            _ => None,
        }
    }
}
