//! Interpreter output: intents, entities, and parsed messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Intent name assigned when the interpreter is not confident enough.
pub const NLU_FALLBACK_INTENT: &str = "nlu_fallback";

/// A classified intent with its confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    pub confidence: f64,
}

impl Intent {
    /// Creates an intent, clamping the confidence into `[0, 1]`.
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// A structured value extracted from a span of the input text.
///
/// `start` and `end` are byte offsets into the original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity: String,
    pub value: Value,
    pub start: usize,
    pub end: usize,
}

impl Entity {
    pub fn new(entity: impl Into<String>, value: impl Into<Value>, start: usize, end: usize) -> Self {
        Self {
            entity: entity.into(),
            value: value.into(),
            start,
            end,
        }
    }
}

/// Full interpreter result for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub text: String,
    pub intent: Option<Intent>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub intent_ranking: Vec<Intent>,
}

impl ParsedMessage {
    /// A parse result with no recognized intent.
    pub fn unrecognized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: None,
            entities: Vec::new(),
            intent_ranking: Vec::new(),
        }
    }

    /// A parse result with a single intent.
    pub fn with_intent(text: impl Into<String>, intent: Intent) -> Self {
        Self {
            text: text.into(),
            intent_ranking: vec![intent.clone()],
            intent: Some(intent),
            entities: Vec::new(),
        }
    }

    /// Adds entities, keeping them in left-to-right span order.
    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities.extend(entities);
        self.entities.sort_by_key(|e| (e.start, e.end));
        self
    }

    /// Confidence of the top intent, 0.0 when there is none.
    pub fn confidence(&self) -> f64 {
        self.intent.as_ref().map(|i| i.confidence).unwrap_or(0.0)
    }
}
