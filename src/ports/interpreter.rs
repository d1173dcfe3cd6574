//! Interpreter Port - Interface for natural language understanding.
//!
//! An interpreter maps raw user text to an intent, a confidence, and a list
//! of extracted entities. Interpreters are stateless per call; anything they
//! need (patterns, models) is loaded up front.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct KeywordInterpreter;
//!
//! #[async_trait]
//! impl Interpreter for KeywordInterpreter {
//!     async fn parse(&self, text: &str) -> Result<ParsedMessage, InterpreterError> {
//!         if text.contains("hours") {
//!             Ok(ParsedMessage::with_intent(text, Intent::new("ask_hours", 0.9)))
//!         } else {
//!             Ok(ParsedMessage::unrecognized(text))
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::dialogue::ParsedMessage;

/// Port for utterance interpretation.
#[async_trait]
pub trait Interpreter: Send + Sync {
    /// Parse one utterance.
    ///
    /// Returning a message with no intent is not an error; errors are
    /// reserved for interpreter failures.
    async fn parse(&self, text: &str) -> Result<ParsedMessage, InterpreterError>;
}

/// Errors from an interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    /// The interpreter is not able to serve requests.
    #[error("interpreter unavailable: {0}")]
    Unavailable(String),

    /// The input could not be processed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
