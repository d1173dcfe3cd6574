//! ConversationStatus enum for pausing and resuming a conversation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::StateMachine;

/// Whether the bot currently reacts to user messages.
///
/// While paused, user messages are still logged but the policy always
/// selects `action_listen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    Active,
    Paused,
}

impl ConversationStatus {
    /// Returns true if the bot should respond to user input.
    pub fn is_active(&self) -> bool {
        matches!(self, ConversationStatus::Active)
    }
}

impl StateMachine for ConversationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConversationStatus::*;
        matches!((self, target), (Active, Paused) | (Paused, Active))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConversationStatus::*;
        match self {
            Active => vec![Paused],
            Paused => vec![Active],
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversationStatus::Active => "Active",
            ConversationStatus::Paused => "Paused",
        };
        write!(f, "{}", s)
    }
}
