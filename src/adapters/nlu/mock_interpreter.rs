//! Mock Interpreter for testing.
//!
//! Returns pre-configured parse results keyed by the exact message text.
//! Unknown text parses as unrecognized. Supports simulated latency, error
//! injection, and call tracking.
//!
//! # Example
//!
//! ```ignore
//! let interpreter = MockInterpreter::new()
//!     .with_intent("when are you open?", "ask_hours", 0.9)
//!     .with_error("boom", InterpreterError::Unavailable("down".into()));
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::dialogue::{Entity, Intent, ParsedMessage};
use crate::ports::{Interpreter, InterpreterError};

#[derive(Debug, Clone)]
enum MockParse {
    Success(ParsedMessage),
    Error(InterpreterError),
}

#[derive(Debug, Clone, Default)]
pub struct MockInterpreter {
    responses: Arc<Mutex<HashMap<String, MockParse>>>,
    delay: Duration,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `text` as `intent` with the given confidence.
    pub fn with_intent(self, text: impl Into<String>, intent: impl Into<String>, confidence: f64) -> Self {
        let text = text.into();
        let parsed = ParsedMessage::with_intent(text.clone(), Intent::new(intent, confidence));
        self.with_parse(text, parsed)
    }

    /// Parses `text` as `intent` with entities.
    pub fn with_entities(
        self,
        text: impl Into<String>,
        intent: impl Into<String>,
        confidence: f64,
        entities: Vec<Entity>,
    ) -> Self {
        let text = text.into();
        let parsed =
            ParsedMessage::with_intent(text.clone(), Intent::new(intent, confidence)).with_entities(entities);
        self.with_parse(text, parsed)
    }

    /// Returns `parsed` for `text`.
    pub fn with_parse(self, text: impl Into<String>, parsed: ParsedMessage) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(text.into(), MockParse::Success(parsed));
        self
    }

    /// Fails when asked to parse `text`.
    pub fn with_error(self, text: impl Into<String>, error: InterpreterError) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(text.into(), MockParse::Error(error));
        self
    }

    /// Sets simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Interpreter for MockInterpreter {
    async fn parse(&self, text: &str) -> Result<ParsedMessage, InterpreterError> {
        self.calls.lock().unwrap().push(text.to_string());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let configured = self.responses.lock().unwrap().get(text).cloned();
        match configured {
            Some(MockParse::Success(parsed)) => Ok(parsed),
            Some(MockParse::Error(err)) => Err(err),
            None => Ok(ParsedMessage::unrecognized(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_intent() {
        let interpreter = MockInterpreter::new().with_intent("when are you open?", "ask_hours", 0.9);

        let parsed = interpreter.parse("when are you open?").await.unwrap();

        assert_eq!(parsed.intent.unwrap(), Intent::new("ask_hours", 0.9));
        assert_eq!(interpreter.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_text_is_unrecognized() {
        let parsed = MockInterpreter::new().parse("???").await.unwrap();
        assert!(parsed.intent.is_none());
    }

    #[tokio::test]
    async fn injected_error_is_returned() {
        let interpreter =
            MockInterpreter::new().with_error("boom", InterpreterError::Unavailable("down".into()));

        assert_eq!(
            interpreter.parse("boom").await.unwrap_err(),
            InterpreterError::Unavailable("down".into())
        );
        assert_eq!(interpreter.get_calls(), vec!["boom".to_string()]);
    }

    #[tokio::test]
    async fn entities_are_attached() {
        let interpreter = MockInterpreter::new().with_entities(
            "order 1234",
            "check_order",
            0.8,
            vec![Entity::new("order_id", "1234", 6, 10)],
        );

        let parsed = interpreter.parse("order 1234").await.unwrap();
        assert_eq!(parsed.entities.len(), 1);
    }
}
