//! Application handlers.
//!
//! Command and query handlers that orchestrate a conversation turn.

mod get_tracker;
mod handle_message;

pub use get_tracker::{GetTrackerHandler, GetTrackerQuery};
pub use handle_message::{
    HandleMessageError, HandleMessageHandler, InboundMessage, TurnIssue, TurnReport, TurnSettings,
    DEFAULT_MAX_ACTIONS_PER_TURN, DEFAULT_NLU_THRESHOLD,
};
