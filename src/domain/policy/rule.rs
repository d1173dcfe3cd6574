//! Rule policy.
//!
//! Every rule is canonicalized into explicit steps. For each prefix that is
//! followed by an action step, the rule predicts that action when the
//! tracker's step history ends with the prefix and the rule's slot
//! conditions hold.
//!
//! # Precedence
//!
//! 1. Longest matching prefix
//! 2. Most slot conditions
//! 3. Earliest declared rule

use crate::domain::dialogue::{DialogueStateTracker, Rule, SlotCondition, Step};

use super::{Policy, Prediction};

pub const RULE_POLICY_NAME: &str = "rule";

#[derive(Debug, Clone)]
struct CanonicalRule {
    name: String,
    condition: Vec<SlotCondition>,
    steps: Vec<Step>,
}

/// The rule that won a prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule_name: String,
    pub action_name: String,
    pub prefix_len: usize,
    pub conditions: usize,
    pub rule_index: usize,
}

impl RuleMatch {
    /// Orders candidates so that the preferred match compares greatest.
    fn rank(&self) -> (usize, usize, std::cmp::Reverse<usize>) {
        (self.prefix_len, self.conditions, std::cmp::Reverse(self.rule_index))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RulePolicy {
    rules: Vec<CanonicalRule>,
}

impl RulePolicy {
    pub fn new(rules: &[Rule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CanonicalRule {
                name: rule.name.clone(),
                condition: rule.condition.clone(),
                steps: rule.canonical_steps(),
            })
            .collect();
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Finds the winning rule for the tracker's current step history.
    pub fn matching_rule(&self, tracker: &DialogueStateTracker) -> Option<RuleMatch> {
        let history = tracker.turn_steps();
        let slots = tracker.current_slots();

        let mut best: Option<RuleMatch> = None;
        for (rule_index, rule) in self.rules.iter().enumerate() {
            if !rule.condition.iter().all(|c| c.holds(slots)) {
                continue;
            }
            for split in 1..rule.steps.len() {
                let Step::Action(next) = &rule.steps[split] else {
                    continue;
                };
                if !history.ends_with(&rule.steps[..split]) {
                    continue;
                }
                let candidate = RuleMatch {
                    rule_name: rule.name.clone(),
                    action_name: next.clone(),
                    prefix_len: split,
                    conditions: rule.condition.len(),
                    rule_index,
                };
                if best.as_ref().map_or(true, |b| candidate.rank() > b.rank()) {
                    best = Some(candidate);
                }
            }
        }
        best
    }
}

impl Policy for RulePolicy {
    fn name(&self) -> &'static str {
        RULE_POLICY_NAME
    }

    fn predict(&self, tracker: &DialogueStateTracker) -> Option<Prediction> {
        let matched = self.matching_rule(tracker)?;
        let action = tracker.domain().action_for_name(&matched.action_name)?;
        tracing::trace!(rule = %matched.rule_name, action = %matched.action_name, "Rule matched");
        Some(Prediction::new(action, 1.0, RULE_POLICY_NAME))
    }
}
