//! Application layer - Turn handling and session lifecycle.
//!
//! This layer orchestrates the dialogue domain and coordinates between ports:
//! - `HandleMessageHandler` runs one conversational turn
//! - `GetTrackerHandler` reads a conversation
//! - `ActionExecutor` runs selected actions against tracker snapshots
//! - `SessionManager` and `SessionSweeper` own live sessions
//! - `Agent` wires everything together

mod action_executor;
mod action_registry;
mod agent;
pub mod handlers;
mod session_manager;
mod session_sweeper;

pub use action_executor::{ActionExecutionFailed, ActionExecutor, ActionFailureCause, DEFAULT_ACTION_TIMEOUT};
pub use action_registry::ActionRegistry;
pub use agent::{Agent, AgentBuilder};
pub use handlers::{
    GetTrackerHandler, GetTrackerQuery, HandleMessageError, HandleMessageHandler, InboundMessage, TurnIssue,
    TurnReport, TurnSettings, DEFAULT_MAX_ACTIONS_PER_TURN, DEFAULT_NLU_THRESHOLD,
};
pub use session_manager::{BusyPolicy, Session, SessionManager};
pub use session_sweeper::{SessionSweeper, SessionSweeperConfig};
