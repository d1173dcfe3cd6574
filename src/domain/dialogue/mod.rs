//! Dialogue domain: events, slots, the domain declaration, and the tracker.
//!
//! # Module Organization
//!
//! - `nlu` - Interpreter output (intents, entities)
//! - `event` - The event log vocabulary
//! - `slot` - Slot declarations and the typed slot store
//! - `response` - Response templates and rendering
//! - `action` - Selectable actions and built-in names
//! - `declaration` - The validated `Domain`
//! - `training` - Rules and stories
//! - `tracker` - Event-sourced dialogue state

mod action;
mod declaration;
mod errors;
mod event;
mod nlu;
mod response;
mod slot;
mod tracker;
mod training;

pub use action::{
    Action, ACTION_DEFAULT_FALLBACK, ACTION_LISTEN, ACTION_RESTART, ACTION_SESSION_START, BUILTIN_ACTIONS,
    UTTER_DEFAULT, UTTER_PREFIX,
};
pub use declaration::{Domain, DomainBuilder, SessionSettings};
pub use errors::{DomainLoadError, TrackerError};
pub use event::{Event, EventKind};
pub use nlu::{Entity, Intent, ParsedMessage, NLU_FALLBACK_INTENT};
pub use response::{render, select_variation, ResponseVariation};
pub use slot::{SlotCondition, SlotDefinition, SlotMapping, SlotStore, SlotType};
pub use tracker::{DialogueStateTracker, TrackerSnapshot};
pub use training::{Rule, Step, Story, StoryStep, TrainingData};
