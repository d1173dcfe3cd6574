//! Regex Interpreter Adapter
//!
//! A deterministic interpreter driven by per-intent patterns and per-entity
//! regexes, loaded from YAML:
//!
//! ```yaml
//! intents:
//!   greet: ["\\b(hi|hello|hey)\\b"]
//!   ask_hours: ["\\bopen\\b", "\\bhours\\b"]
//! entities:
//!   order_id: ["#?(\\d{4,})"]
//! ```
//!
//! Patterns match case-insensitively. An intent's confidence grows with how
//! much of the message its best pattern covers, from 0.5 for a single
//! character up to 1.0 for the whole message. An entity's value is its
//! first capture group, or the whole match when the pattern has none.
//!
//! Text of the form `/intent{"entity": "value"}` bypasses the patterns and
//! yields that intent at confidence 1.0.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::dialogue::{Domain, DomainLoadError, Entity, Intent, ParsedMessage};
use crate::ports::{Interpreter, InterpreterError};

static SHORTCUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/([A-Za-z_][A-Za-z0-9_]*)\s*(\{.*\})?\s*$").expect("shortcut pattern is valid")
});

#[derive(Debug, Default, Deserialize)]
struct NluFile {
    #[serde(default)]
    intents: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    entities: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct RegexInterpreter {
    intents: Vec<(String, Vec<Regex>)>,
    entities: Vec<(String, Vec<Regex>)>,
}

fn compile(name: &str, patterns: &[String]) -> Result<Vec<Regex>, DomainLoadError> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| DomainLoadError::InvalidPattern {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

impl RegexInterpreter {
    pub fn from_yaml(yaml: &str) -> Result<Self, DomainLoadError> {
        let file: NluFile = serde_yaml::from_str(yaml).map_err(|e| DomainLoadError::parse("nlu data", e))?;

        let intents = file
            .intents
            .iter()
            .map(|(name, patterns)| Ok((name.clone(), compile(name, patterns)?)))
            .collect::<Result<Vec<_>, DomainLoadError>>()?;
        let entities = file
            .entities
            .iter()
            .map(|(name, patterns)| Ok((name.clone(), compile(name, patterns)?)))
            .collect::<Result<Vec<_>, DomainLoadError>>()?;

        Ok(Self { intents, entities })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainLoadError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| DomainLoadError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&yaml)
    }

    /// Checks that every intent and entity is declared in the domain.
    pub fn validate(&self, domain: &Domain) -> Result<(), DomainLoadError> {
        for (name, _) in &self.intents {
            if !domain.has_intent(name) {
                return Err(DomainLoadError::unknown_intent(name, "nlu data"));
            }
        }
        for (name, _) in &self.entities {
            if !domain.has_entity(name) {
                return Err(DomainLoadError::unknown_entity(name, "nlu data"));
            }
        }
        Ok(())
    }

    fn rank_intents(&self, text: &str) -> Vec<Intent> {
        let len = text.chars().count().max(1) as f64;
        let mut ranking: Vec<Intent> = self
            .intents
            .iter()
            .filter_map(|(name, patterns)| {
                let covered = patterns
                    .iter()
                    .filter_map(|re| re.find(text))
                    .map(|m| m.as_str().chars().count())
                    .max()?;
                let coverage = (covered as f64 / len).min(1.0);
                Some(Intent::new(name.clone(), 0.5 + 0.5 * coverage))
            })
            .collect();
        // Stable sort keeps alphabetical order among equal confidences.
        ranking.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranking
    }

    fn extract_entities(&self, text: &str) -> Vec<Entity> {
        let mut found: Vec<Entity> = Vec::new();
        for (name, patterns) in &self.entities {
            for re in patterns {
                for caps in re.captures_iter(text) {
                    let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
                        continue;
                    };
                    if m.as_str().is_empty() {
                        continue;
                    }
                    found.push(Entity::new(name.clone(), m.as_str(), m.start(), m.end()));
                }
            }
        }

        // Leftmost-longest wins; overlapping spans are dropped.
        found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        let mut kept: Vec<Entity> = Vec::with_capacity(found.len());
        for entity in found {
            if kept.last().map_or(true, |last| entity.start >= last.end) {
                kept.push(entity);
            }
        }
        kept
    }

    fn parse_shortcut(text: &str) -> Option<Result<ParsedMessage, InterpreterError>> {
        let caps = SHORTCUT.captures(text)?;
        let intent = Intent::new(&caps[1], 1.0);
        let mut parsed = ParsedMessage::with_intent(text, intent);

        if let Some(json) = caps.get(2) {
            let entities = match serde_json::from_str::<serde_json::Map<String, Value>>(json.as_str()) {
                Ok(map) => map
                    .into_iter()
                    .map(|(name, value)| Entity::new(name, value, json.start(), json.end()))
                    .collect(),
                Err(e) => {
                    return Some(Err(InterpreterError::InvalidInput(format!(
                        "entities in '{}' are not a JSON object: {}",
                        text, e
                    ))))
                }
            };
            parsed = parsed.with_entities(entities);
        }
        Some(Ok(parsed))
    }
}

#[async_trait]
impl Interpreter for RegexInterpreter {
    async fn parse(&self, text: &str) -> Result<ParsedMessage, InterpreterError> {
        let text = text.trim();
        if let Some(result) = Self::parse_shortcut(text) {
            return result;
        }

        let ranking = self.rank_intents(text);
        let entities = self.extract_entities(text);

        let mut parsed = match ranking.first() {
            Some(top) => ParsedMessage::with_intent(text, top.clone()),
            None => ParsedMessage::unrecognized(text),
        };
        parsed.intent_ranking = ranking;
        Ok(parsed.with_entities(entities))
    }
}
