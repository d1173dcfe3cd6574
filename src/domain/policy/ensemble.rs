//! Policy ensemble.
//!
//! Applies built-in conversation handling first, then the rule policy, then
//! any learned policies in order. When nothing is confident the ensemble
//! falls back to `action_default_fallback`.

use crate::domain::dialogue::{
    Action, DialogueStateTracker, Domain, Step, TrainingData, ACTION_DEFAULT_FALLBACK,
    ACTION_RESTART, ACTION_SESSION_START, NLU_FALLBACK_INTENT,
};

use super::{MemoizationPolicy, Policy, Prediction, RulePolicy};

pub const ENSEMBLE_POLICY_NAME: &str = "ensemble";

/// Intent that restarts the conversation when the domain declares it.
const RESTART_INTENT: &str = "restart";

pub struct PolicyEnsemble {
    rules: RulePolicy,
    learned: Vec<Box<dyn Policy>>,
}

impl PolicyEnsemble {
    pub fn new(rules: RulePolicy) -> Self {
        Self {
            rules,
            learned: Vec::new(),
        }
    }

    /// Builds the standard ensemble: rules plus a memoization policy trained
    /// on the same data. Training data must already be validated.
    pub fn from_training(
        training: &TrainingData,
        domain: &Domain,
        max_history: usize,
        core_threshold: f64,
    ) -> Self {
        let memo = MemoizationPolicy::new(max_history, core_threshold).train(training, domain);
        Self::new(RulePolicy::new(&training.rules)).with_policy(Box::new(memo))
    }

    /// Adds a learned policy, consulted after earlier ones abstain.
    pub fn with_policy(mut self, policy: Box<dyn Policy>) -> Self {
        self.learned.push(policy);
        self
    }

    pub fn policy_names(&self) -> Vec<&'static str> {
        std::iter::once(self.rules.name())
            .chain(self.learned.iter().map(|p| p.name()))
            .collect()
    }

    /// Selects the next action.
    ///
    /// `previous_failure` is set when the last selected action failed to
    /// execute in this turn.
    pub fn select_next_action(&self, tracker: &DialogueStateTracker, previous_failure: bool) -> Prediction {
        if let Some(prediction) = self.builtin(tracker, previous_failure) {
            return prediction;
        }

        if let Some(prediction) = self.rules.predict(tracker) {
            return prediction;
        }

        if tracker
            .latest_intent()
            .is_some_and(|intent| intent.name == NLU_FALLBACK_INTENT)
            && user_just_spoke(tracker)
        {
            return builtin(Action::DefaultFallback);
        }

        for policy in &self.learned {
            if let Some(prediction) = policy.predict(tracker) {
                return prediction;
            }
        }

        tracing::debug!(sender = %tracker.sender_id(), "No policy was confident, falling back");
        Prediction::new(Action::DefaultFallback, 0.0, ENSEMBLE_POLICY_NAME)
    }

    fn builtin(&self, tracker: &DialogueStateTracker, previous_failure: bool) -> Option<Prediction> {
        if tracker.is_paused() {
            return Some(builtin(Action::Listen));
        }

        if previous_failure {
            return Some(builtin(Action::DefaultFallback));
        }

        if let Some(name) = tracker.followup_action() {
            if let Some(action) = tracker.domain().action_for_name(name) {
                return Some(builtin(action));
            }
            tracing::warn!(action = name, "Followup names an unknown action, ignoring");
        }

        let after_terminal_action = matches!(
            tracker.latest_action_name(),
            Some(ACTION_DEFAULT_FALLBACK | ACTION_RESTART | ACTION_SESSION_START)
        );
        if after_terminal_action || tracker.latest_message().is_none() {
            return Some(builtin(Action::Listen));
        }

        let restart_requested = tracker
            .latest_intent()
            .is_some_and(|intent| intent.name == RESTART_INTENT)
            && tracker.domain().has_intent(RESTART_INTENT)
            && user_just_spoke(tracker);
        if restart_requested {
            return Some(builtin(Action::Restart));
        }

        None
    }
}

fn builtin(action: Action) -> Prediction {
    Prediction::new(action, 1.0, ENSEMBLE_POLICY_NAME)
}

/// True when no action has run since the latest user message.
fn user_just_spoke(tracker: &DialogueStateTracker) -> bool {
    matches!(tracker.turn_steps().last(), Some(Step::Intent(_)))
}
