//! Actions the dialogue manager can select.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ACTION_LISTEN: &str = "action_listen";
pub const ACTION_DEFAULT_FALLBACK: &str = "action_default_fallback";
pub const ACTION_RESTART: &str = "action_restart";
pub const ACTION_SESSION_START: &str = "action_session_start";

/// Prefix marking an action as a response template.
pub const UTTER_PREFIX: &str = "utter_";

/// Response template rendered by the default fallback, if declared.
pub const UTTER_DEFAULT: &str = "utter_default";

/// Names that may not be declared as custom actions or responses.
pub const BUILTIN_ACTIONS: [&str; 4] = [
    ACTION_LISTEN,
    ACTION_DEFAULT_FALLBACK,
    ACTION_RESTART,
    ACTION_SESSION_START,
];

/// Next step selected by the policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Stop and wait for the next user message.
    Listen,
    /// Render a response template.
    Utter { template_id: String },
    /// Invoke a registered custom action handler.
    Custom { handler_id: String },
    /// Nothing confident enough to do.
    DefaultFallback,
    /// Restart the conversation.
    Restart,
    /// Start a new session.
    SessionStart,
}

impl Action {
    pub fn utter(template_id: impl Into<String>) -> Self {
        Action::Utter {
            template_id: template_id.into(),
        }
    }

    pub fn custom(handler_id: impl Into<String>) -> Self {
        Action::Custom {
            handler_id: handler_id.into(),
        }
    }

    /// Resolves a built-in action by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            ACTION_LISTEN => Some(Action::Listen),
            ACTION_DEFAULT_FALLBACK => Some(Action::DefaultFallback),
            ACTION_RESTART => Some(Action::Restart),
            ACTION_SESSION_START => Some(Action::SessionStart),
            _ => None,
        }
    }

    /// The name recorded in `ActionExecuted` events.
    pub fn name(&self) -> &str {
        match self {
            Action::Listen => ACTION_LISTEN,
            Action::Utter { template_id } => template_id,
            Action::Custom { handler_id } => handler_id,
            Action::DefaultFallback => ACTION_DEFAULT_FALLBACK,
            Action::Restart => ACTION_RESTART,
            Action::SessionStart => ACTION_SESSION_START,
        }
    }

    pub fn is_listen(&self) -> bool {
        matches!(self, Action::Listen)
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Action::Custom { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
