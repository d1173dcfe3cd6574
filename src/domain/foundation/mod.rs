//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the dialogue domain.

mod conversation_status;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use conversation_status::ConversationStatus;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{SenderId, SessionId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
