//! Error types for the dialogue domain.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors raised when an event cannot be applied to a tracker.
///
/// A rejected event leaves the tracker unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("Unknown slot: {0}")]
    UnknownSlot(String),

    #[error("Invalid value for slot '{name}': {reason}")]
    InvalidSlotValue { name: String, reason: String },

    #[error("Invalid conversation transition: {0}")]
    InvalidTransition(#[from] ValidationError),
}

impl From<TrackerError> for DomainError {
    fn from(err: TrackerError) -> Self {
        let code = match &err {
            TrackerError::UnknownSlot(_) => ErrorCode::UnknownSlot,
            TrackerError::InvalidSlotValue { .. } | TrackerError::InvalidTransition(_) => {
                ErrorCode::ValidationFailed
            }
        };
        DomainError::new(code, err.to_string())
    }
}

/// Inconsistent domain, training data, or registrations.
///
/// Always fatal at load time; never surfaced from a live conversation.
#[derive(Debug, Error)]
pub enum DomainLoadError {
    #[error("Unknown intent '{intent}' referenced in {location}")]
    UnknownIntent { intent: String, location: String },

    #[error("Unknown entity '{entity}' referenced in {location}")]
    UnknownEntity { entity: String, location: String },

    #[error("Unknown slot '{slot}' referenced in {location}")]
    UnknownSlot { slot: String, location: String },

    #[error("Unknown action '{action}' referenced in {location}")]
    UnknownAction { action: String, location: String },

    #[error("Action '{0}' has no response template")]
    MissingResponse(String),

    #[error("Invalid slot '{slot}': {reason}")]
    InvalidSlot { slot: String, reason: String },

    #[error("Name '{0}' is reserved for a built-in")]
    ReservedName(String),

    #[error("Invalid pattern for '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Failed to parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}

impl DomainLoadError {
    pub fn unknown_intent(intent: impl Into<String>, location: impl Into<String>) -> Self {
        Self::UnknownIntent {
            intent: intent.into(),
            location: location.into(),
        }
    }

    pub fn unknown_entity(entity: impl Into<String>, location: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity: entity.into(),
            location: location.into(),
        }
    }

    pub fn unknown_slot(slot: impl Into<String>, location: impl Into<String>) -> Self {
        Self::UnknownSlot {
            slot: slot.into(),
            location: location.into(),
        }
    }

    pub fn unknown_action(action: impl Into<String>, location: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
            location: location.into(),
        }
    }

    pub fn parse(what: &'static str, reason: impl ToString) -> Self {
        Self::Parse {
            what,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_slot_maps_to_error_code() {
        let err: DomainError = TrackerError::UnknownSlot("colour".into()).into();
        assert_eq!(err.code, ErrorCode::UnknownSlot);
        assert!(err.message.contains("colour"));
    }

    #[test]
    fn load_error_names_location() {
        let err = DomainLoadError::unknown_intent("ask_weather", "rule 'weather'");
        assert_eq!(
            err.to_string(),
            "Unknown intent 'ask_weather' referenced in rule 'weather'"
        );
    }
}
