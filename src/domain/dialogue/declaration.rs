//! Domain declaration: the universe a bot operates in.
//!
//! Enumerates intents, entities, slots, actions, and response templates.
//! Every cross-reference is validated when the domain is built, so a live
//! conversation never meets an undeclared name.
//!
//! # YAML format
//!
//! ```yaml
//! intents: [greet, ask_hours, check_order]
//! entities: [order_id]
//! slots:
//!   order_id:
//!     type: text
//!     mappings:
//!       - type: from_entity
//!         entity: order_id
//! actions: [action_check_order_status]
//! responses:
//!   utter_hours:
//!     - text: "We're open Monday to Friday, 9am to 5pm."
//! session_config:
//!   session_expiration_time: 60
//!   carry_over_slots_to_new_session: true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use super::action::{Action, BUILTIN_ACTIONS, UTTER_PREFIX};
use super::errors::DomainLoadError;
use super::nlu::NLU_FALLBACK_INTENT;
use super::response::ResponseVariation;
use super::slot::{SlotDefinition, SlotMapping, SlotStore};

/// Session lifetime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Minutes of user inactivity after which the next message starts a new
    /// session. `0` disables expiry.
    #[serde(default = "default_session_expiration")]
    pub session_expiration_time: u64,

    /// Whether slot values survive into the new session.
    #[serde(default = "default_carry_over")]
    pub carry_over_slots_to_new_session: bool,
}

fn default_session_expiration() -> u64 {
    60
}

fn default_carry_over() -> bool {
    true
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_expiration_time: default_session_expiration(),
            carry_over_slots_to_new_session: default_carry_over(),
        }
    }
}

impl SessionSettings {
    /// Expiry in seconds, `None` when sessions never expire.
    pub fn expiration_secs(&self) -> Option<u64> {
        (self.session_expiration_time > 0).then(|| self.session_expiration_time.saturating_mul(60))
    }
}

#[derive(Debug, Default, Deserialize)]
struct DomainFile {
    #[serde(default)]
    intents: Vec<String>,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    slots: BTreeMap<String, SlotDefinition>,
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    responses: BTreeMap<String, Vec<ResponseVariation>>,
    #[serde(default)]
    session_config: SessionSettings,
}

/// Validated, immutable domain declaration.
#[derive(Debug, Clone)]
pub struct Domain {
    intents: BTreeSet<String>,
    entities: BTreeSet<String>,
    slots: Arc<BTreeMap<String, SlotDefinition>>,
    custom_actions: BTreeSet<String>,
    responses: BTreeMap<String, Vec<ResponseVariation>>,
    session: SessionSettings,
}

impl Domain {
    pub fn builder() -> DomainBuilder {
        DomainBuilder::default()
    }

    /// Parses and validates a domain from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, DomainLoadError> {
        let file: DomainFile = serde_yaml::from_str(yaml).map_err(|e| DomainLoadError::parse("domain", e))?;

        let mut builder = DomainBuilder {
            intents: file.intents,
            entities: file.entities,
            slots: Vec::new(),
            actions: file.actions,
            responses: file.responses,
            session: file.session_config,
        };
        for (name, mut definition) in file.slots {
            definition.name = name;
            builder.slots.push(definition);
        }
        builder.build()
    }

    /// Reads and validates a domain file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainLoadError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| DomainLoadError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&yaml)
    }

    /// Returns true for declared intents and the implicit `nlu_fallback`.
    pub fn has_intent(&self, name: &str) -> bool {
        name == NLU_FALLBACK_INTENT || self.intents.contains(name)
    }

    pub fn intents(&self) -> impl Iterator<Item = &str> {
        self.intents.iter().map(String::as_str)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entities.contains(name)
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn slot_definitions(&self) -> Arc<BTreeMap<String, SlotDefinition>> {
        Arc::clone(&self.slots)
    }

    /// A slot store with every slot at its initial value.
    pub fn new_slot_store(&self) -> SlotStore {
        SlotStore::new(self.slot_definitions())
    }

    /// Resolves any action name: built-ins, response templates, custom actions.
    pub fn action_for_name(&self, name: &str) -> Option<Action> {
        if let Some(action) = Action::builtin(name) {
            return Some(action);
        }
        if self.responses.contains_key(name) {
            return Some(Action::utter(name));
        }
        if self.custom_actions.contains(name) {
            return Some(Action::custom(name));
        }
        None
    }

    /// Like [`action_for_name`](Self::action_for_name) but fails with a load error.
    pub fn resolve_action(&self, name: &str, location: &str) -> Result<Action, DomainLoadError> {
        self.action_for_name(name)
            .ok_or_else(|| DomainLoadError::unknown_action(name, location))
    }

    pub fn has_custom_action(&self, name: &str) -> bool {
        self.custom_actions.contains(name)
    }

    pub fn custom_actions(&self) -> impl Iterator<Item = &str> {
        self.custom_actions.iter().map(String::as_str)
    }

    pub fn response(&self, template_id: &str) -> Option<&[ResponseVariation]> {
        self.responses.get(template_id).map(Vec::as_slice)
    }

    pub fn session_settings(&self) -> &SessionSettings {
        &self.session
    }
}

/// Programmatic domain construction; `build` runs the same validation as YAML loading.
#[derive(Debug, Default)]
pub struct DomainBuilder {
    intents: Vec<String>,
    entities: Vec<String>,
    slots: Vec<SlotDefinition>,
    actions: Vec<String>,
    responses: BTreeMap<String, Vec<ResponseVariation>>,
    session: SessionSettings,
}

impl DomainBuilder {
    pub fn intent(mut self, name: impl Into<String>) -> Self {
        self.intents.push(name.into());
        self
    }

    pub fn entity(mut self, name: impl Into<String>) -> Self {
        self.entities.push(name.into());
        self
    }

    pub fn slot(mut self, definition: SlotDefinition) -> Self {
        self.slots.push(definition);
        self
    }

    /// Declares a custom action.
    pub fn action(mut self, name: impl Into<String>) -> Self {
        self.actions.push(name.into());
        self
    }

    /// Declares a response with a single unconditional variation.
    pub fn response(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.response_variations(name, vec![ResponseVariation::new(text)])
    }

    pub fn response_variations(mut self, name: impl Into<String>, variations: Vec<ResponseVariation>) -> Self {
        self.responses.entry(name.into()).or_default().extend(variations);
        self
    }

    pub fn session(mut self, settings: SessionSettings) -> Self {
        self.session = settings;
        self
    }

    pub fn build(self) -> Result<Domain, DomainLoadError> {
        let intents: BTreeSet<String> = self.intents.into_iter().collect();
        let entities: BTreeSet<String> = self.entities.into_iter().collect();

        let mut slots = BTreeMap::new();
        for definition in self.slots {
            validate_slot(&definition, &intents, &entities)?;
            slots.insert(definition.name.clone(), definition);
        }

        for name in self.responses.keys() {
            if BUILTIN_ACTIONS.contains(&name.as_str()) {
                return Err(DomainLoadError::ReservedName(name.clone()));
            }
        }

        let mut custom_actions = BTreeSet::new();
        for name in self.actions {
            if BUILTIN_ACTIONS.contains(&name.as_str()) {
                return Err(DomainLoadError::ReservedName(name));
            }
            if name.starts_with(UTTER_PREFIX) {
                if !self.responses.contains_key(&name) {
                    return Err(DomainLoadError::MissingResponse(name));
                }
            } else {
                custom_actions.insert(name);
            }
        }

        for (name, variations) in &self.responses {
            let location = format!("response '{}'", name);
            for variation in variations {
                for placeholder in variation.placeholders() {
                    if !slots.contains_key(placeholder) {
                        return Err(DomainLoadError::unknown_slot(placeholder, location.clone()));
                    }
                }
                for condition in &variation.condition {
                    if !slots.contains_key(&condition.slot) {
                        return Err(DomainLoadError::unknown_slot(condition.slot.clone(), location.clone()));
                    }
                }
            }
        }

        Ok(Domain {
            intents,
            entities,
            slots: Arc::new(slots),
            custom_actions,
            responses: self.responses,
            session: self.session,
        })
    }
}

fn validate_slot(
    definition: &SlotDefinition,
    intents: &BTreeSet<String>,
    entities: &BTreeSet<String>,
) -> Result<(), DomainLoadError> {
    let invalid = |reason: String| DomainLoadError::InvalidSlot {
        slot: definition.name.clone(),
        reason,
    };

    if definition.name.trim().is_empty() {
        return Err(invalid("slot name cannot be empty".to_string()));
    }
    if definition.slot_type == super::slot::SlotType::Categorical && definition.values.is_empty() {
        return Err(invalid("categorical slot needs values".to_string()));
    }
    definition
        .coerce(&definition.initial_value)
        .map_err(|reason| invalid(format!("initial value: {}", reason)))?;

    let location = format!("mapping of slot '{}'", definition.name);
    for mapping in &definition.mappings {
        match mapping {
            SlotMapping::FromEntity { entity, intents: only } => {
                if !entities.contains(entity) {
                    return Err(DomainLoadError::unknown_entity(entity.clone(), location));
                }
                if let Some(intent) = only.iter().find(|i| !intents.contains(*i)) {
                    return Err(DomainLoadError::unknown_intent(intent.clone(), location));
                }
            }
        }
    }
    Ok(())
}
