//! Response templates rendered by utter actions.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::slot::SlotCondition;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid"));

/// One variation of a response template.
///
/// A variation applies when all of its slot conditions hold; variations
/// without conditions always apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseVariation {
    pub text: String,
    #[serde(default)]
    pub condition: Vec<SlotCondition>,
}

impl ResponseVariation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            condition: Vec::new(),
        }
    }

    pub fn when(mut self, condition: SlotCondition) -> Self {
        self.condition.push(condition);
        self
    }

    pub fn applies(&self, slots: &BTreeMap<String, Value>) -> bool {
        self.condition.iter().all(|c| c.holds(slots))
    }

    /// Names of the `{slot}` placeholders used in the text.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        PLACEHOLDER
            .captures_iter(&self.text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
    }
}

/// Picks the variation to render: the first conditional variation whose
/// conditions hold, otherwise the first unconditional one.
pub fn select_variation<'a>(
    variations: &'a [ResponseVariation],
    slots: &BTreeMap<String, Value>,
) -> Option<&'a ResponseVariation> {
    variations
        .iter()
        .find(|v| !v.condition.is_empty() && v.applies(slots))
        .or_else(|| variations.iter().find(|v| v.condition.is_empty()))
}

/// Substitutes `{slot}` placeholders with current slot values.
///
/// Placeholders naming unknown slots are left untouched; unset slots render
/// as `None`.
pub fn render(text: &str, slots: &BTreeMap<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| match slots.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) => "None".to_string(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
