//! Policy configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::{DEFAULT_MAX_ACTIONS_PER_TURN, DEFAULT_NLU_THRESHOLD};
use crate::domain::policy::{DEFAULT_CORE_THRESHOLD, DEFAULT_MAX_HISTORY};

/// Action selection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Longest dialogue history the memoization policy remembers
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Confidence below which the memoization policy abstains
    #[serde(default = "default_core_threshold")]
    pub core_threshold: f64,

    /// Intent confidence below which a message is treated as `nlu_fallback`
    #[serde(default = "default_nlu_threshold")]
    pub nlu_threshold: f64,

    /// Cap on actions selected for one inbound message
    #[serde(default = "default_max_actions_per_turn")]
    pub max_actions_per_turn: usize,
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_history == 0 {
            return Err(ValidationError::InvalidMaxHistory);
        }
        if !(0.0..=1.0).contains(&self.core_threshold) {
            return Err(ValidationError::InvalidThreshold("core_threshold"));
        }
        if !(0.0..=1.0).contains(&self.nlu_threshold) {
            return Err(ValidationError::InvalidThreshold("nlu_threshold"));
        }
        if self.max_actions_per_turn == 0 {
            return Err(ValidationError::InvalidActionCap);
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            core_threshold: default_core_threshold(),
            nlu_threshold: default_nlu_threshold(),
            max_actions_per_turn: default_max_actions_per_turn(),
        }
    }
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_core_threshold() -> f64 {
    DEFAULT_CORE_THRESHOLD
}

fn default_nlu_threshold() -> f64 {
    DEFAULT_NLU_THRESHOLD
}

fn default_max_actions_per_turn() -> usize {
    DEFAULT_MAX_ACTIONS_PER_TURN
}
