//! Slots and the slot store.
//!
//! Slots are the typed, named pieces of conversation state. The
//! [`SlotStore`] holds the current value of every declared slot and is the
//! only place slot values are validated.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::errors::TrackerError;

/// Value type of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Text,
    Boolean,
    Categorical,
    List,
    Any,
}

/// How a slot is filled automatically from a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotMapping {
    /// Copy the value of an extracted entity. When `intents` is non-empty the
    /// mapping applies only to messages classified as one of them.
    FromEntity {
        entity: String,
        #[serde(default)]
        intents: Vec<String>,
    },
}

/// Declaration of a slot in the domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDefinition {
    /// Filled in from the map key when the domain is loaded.
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub slot_type: SlotType,

    /// Allowed values for categorical slots.
    #[serde(default)]
    pub values: Vec<String>,

    #[serde(default)]
    pub initial_value: Value,

    #[serde(default = "default_influences_policy")]
    pub influences_policy: bool,

    #[serde(default)]
    pub mappings: Vec<SlotMapping>,
}

fn default_influences_policy() -> bool {
    true
}

impl SlotDefinition {
    /// Creates a slot with no initial value that influences the policy.
    pub fn new(name: impl Into<String>, slot_type: SlotType) -> Self {
        Self {
            name: name.into(),
            slot_type,
            values: Vec::new(),
            initial_value: Value::Null,
            influences_policy: slot_type != SlotType::Any,
            mappings: Vec::new(),
        }
    }

    /// Sets the allowed categorical values.
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_initial_value(mut self, value: impl Into<Value>) -> Self {
        self.initial_value = value.into();
        self
    }

    pub fn with_influence(mut self, influences_policy: bool) -> Self {
        self.influences_policy = influences_policy;
        self
    }

    pub fn with_mapping(mut self, mapping: SlotMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Validates a value against the slot type, returning the normalized
    /// value to store. `null` is accepted for every type.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self.slot_type {
            SlotType::Any => Ok(value.clone()),
            SlotType::Text => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err(format!("expected text, got {}", value)),
            },
            SlotType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(format!("expected boolean, got {}", value)),
            },
            SlotType::List => match value {
                Value::Array(_) => Ok(value.clone()),
                _ => Err(format!("expected list, got {}", value)),
            },
            SlotType::Categorical => {
                let raw = match value {
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return Err(format!("expected one of {:?}, got {}", self.values, value)),
                };
                self.values
                    .iter()
                    .find(|allowed| allowed.eq_ignore_ascii_case(&raw))
                    .map(|allowed| Value::String(allowed.clone()))
                    .ok_or_else(|| format!("expected one of {:?}, got {}", self.values, value))
            }
        }
    }

    /// Feature string for the policy, or `None` if the slot is excluded.
    pub fn featurize(&self, value: &Value) -> Option<String> {
        if !self.influences_policy || self.slot_type == SlotType::Any {
            return None;
        }
        let feature = match (self.slot_type, value) {
            (_, Value::Null) => "unset".to_string(),
            (SlotType::Boolean, Value::Bool(b)) => b.to_string(),
            (SlotType::Categorical, Value::String(s)) => s.to_lowercase(),
            (SlotType::List, Value::Array(items)) if items.is_empty() => "empty".to_string(),
            _ => "set".to_string(),
        };
        Some(feature)
    }

    /// Entities this slot is filled from for a message with the given intent.
    pub fn entity_for<'a>(&'a self, intent: Option<&'a str>) -> impl Iterator<Item = &'a str> + 'a {
        self.mappings.iter().filter_map(move |mapping| match mapping {
            SlotMapping::FromEntity { entity, intents } => {
                let applies = intents.is_empty()
                    || intent.is_some_and(|name| intents.iter().any(|i| i == name));
                applies.then_some(entity.as_str())
            }
        })
    }
}

/// Requirement that a slot currently holds a given value.
///
/// A `null` value requires the slot to be unset. String comparison ignores
/// ASCII case, matching how categorical values are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCondition {
    pub slot: String,
    #[serde(default)]
    pub value: Value,
}

impl SlotCondition {
    pub fn new(slot: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            slot: slot.into(),
            value: value.into(),
        }
    }

    /// Returns true if the condition holds for the given slot values.
    pub fn holds(&self, slots: &BTreeMap<String, Value>) -> bool {
        let current = slots.get(&self.slot).unwrap_or(&Value::Null);
        match (current, &self.value) {
            (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
            (a, b) => a == b,
        }
    }
}

/// Typed key/value store for one conversation's slots.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotStore {
    definitions: Arc<BTreeMap<String, SlotDefinition>>,
    values: BTreeMap<String, Value>,
}

impl SlotStore {
    /// Creates a store with every slot at its initial value.
    pub fn new(definitions: Arc<BTreeMap<String, SlotDefinition>>) -> Self {
        let values = Self::initial_values(&definitions);
        Self { definitions, values }
    }

    fn initial_values(definitions: &BTreeMap<String, SlotDefinition>) -> BTreeMap<String, Value> {
        definitions
            .iter()
            .map(|(name, def)| (name.clone(), def.initial_value.clone()))
            .collect()
    }

    /// Current value of a slot; `None` if the slot is not declared.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All slot values, keyed by name.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn definition(&self, name: &str) -> Option<&SlotDefinition> {
        self.definitions.get(name)
    }

    pub fn definitions(&self) -> &BTreeMap<String, SlotDefinition> {
        &self.definitions
    }

    /// Validates a value without storing it.
    pub fn check(&self, name: &str, value: &Value) -> Result<Value, TrackerError> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| TrackerError::UnknownSlot(name.to_string()))?;
        definition
            .coerce(value)
            .map_err(|reason| TrackerError::InvalidSlotValue {
                name: name.to_string(),
                reason,
            })
    }

    /// Validates and stores a value (last write wins).
    pub fn set(&mut self, name: &str, value: &Value) -> Result<(), TrackerError> {
        let value = self.check(name, value)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Returns every slot to its initial value.
    pub fn reset(&mut self) {
        self.values = Self::initial_values(&self.definitions);
    }

    /// Slots that differ from their initial value.
    pub fn changed(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter().filter(|(name, value)| {
            self.definitions
                .get(*name)
                .is_some_and(|def| &def.initial_value != *value)
        })
    }

    /// Policy features for every slot that influences the policy.
    pub fn featurize(&self) -> BTreeMap<String, String> {
        self.definitions
            .iter()
            .filter_map(|(name, def)| {
                let value = self.values.get(name).unwrap_or(&Value::Null);
                def.featurize(value).map(|feature| (name.clone(), feature))
            })
            .collect()
    }
}
