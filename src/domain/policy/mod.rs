//! Policy module - next-action selection.
//!
//! # Components
//!
//! - `RulePolicy` - Deterministic matching of rule prefixes against the step history
//! - `MemoizationPolicy` - Frequency lookup of featurized state windows learned from stories
//! - `PolicyEnsemble` - Built-in behavior, then rules, then learned policies
//!
//! Policies are pure: they read a tracker and return a [`Prediction`]. They
//! never mutate state.

mod ensemble;
mod featurizer;
mod memoization;
mod rule;

pub use ensemble::{PolicyEnsemble, ENSEMBLE_POLICY_NAME};
pub use featurizer::{DialogueState, StateFeaturizer};
pub use memoization::{MemoizationPolicy, DEFAULT_CORE_THRESHOLD, DEFAULT_MAX_HISTORY, MEMOIZATION_POLICY_NAME};
pub use rule::{RuleMatch, RulePolicy, RULE_POLICY_NAME};

use crate::domain::dialogue::{Action, DialogueStateTracker};

/// A policy's choice of next action.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub action: Action,
    pub confidence: f64,
    pub policy: &'static str,
}

impl Prediction {
    pub fn new(action: Action, confidence: f64, policy: &'static str) -> Self {
        Self {
            action,
            confidence,
            policy,
        }
    }
}

/// Predicts the next action from the tracker state.
///
/// Returning `None` means the policy abstains and the next policy is asked.
pub trait Policy: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict(&self, tracker: &DialogueStateTracker) -> Option<Prediction>;
}
