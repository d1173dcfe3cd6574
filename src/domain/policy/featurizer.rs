//! State featurization shared by training and prediction.
//!
//! A [`DialogueState`] is taken at every point where an action is predicted:
//! the previous action, the latest user intent, and the features of every
//! slot that influences the policy. No action yet counts as `action_listen`,
//! so the first turn of a conversation looks like any later turn.

use std::collections::BTreeMap;

use crate::domain::dialogue::{
    DialogueStateTracker, Domain, EventKind, Rule, SlotStore, Step, Story, StoryStep, ACTION_LISTEN,
    NLU_FALLBACK_INTENT,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DialogueState {
    pub prev_action: String,
    pub intent: Option<String>,
    pub slots: BTreeMap<String, String>,
}

/// A featurized state history and the action that followed it.
pub type TrainingExample = (Vec<DialogueState>, String);

struct Fold {
    prev_action: String,
    intent: Option<String>,
    slots: SlotStore,
    states: Vec<DialogueState>,
}

impl Fold {
    fn new(slots: SlotStore) -> Self {
        Self {
            prev_action: ACTION_LISTEN.to_string(),
            intent: None,
            slots,
            states: Vec::new(),
        }
    }

    fn current(&self) -> DialogueState {
        DialogueState {
            prev_action: self.prev_action.clone(),
            intent: self.intent.clone(),
            slots: self.slots.featurize(),
        }
    }

    fn action(&mut self, name: &str) {
        let state = self.current();
        self.states.push(state);
        self.prev_action = name.to_string();
    }
}

pub struct StateFeaturizer;

impl StateFeaturizer {
    /// States at each action of the current episode, followed by the
    /// current state.
    pub fn tracker_states(tracker: &DialogueStateTracker) -> Vec<DialogueState> {
        let mut fold = Fold::new(tracker.domain().new_slot_store());
        for event in tracker.applied_events() {
            match &event.kind {
                EventKind::UserUttered { intent, .. } => {
                    fold.intent = Some(
                        intent
                            .as_ref()
                            .map(|i| i.name.clone())
                            .unwrap_or_else(|| NLU_FALLBACK_INTENT.to_string()),
                    );
                }
                EventKind::SlotSet { name, value } => {
                    // Already validated when the event was appended.
                    let _ = fold.slots.set(name, value);
                }
                EventKind::AllSlotsReset => fold.slots.reset(),
                EventKind::ActionExecuted { name, .. } => fold.action(name),
                _ => {}
            }
        }
        let current = fold.current();
        fold.states.push(current);
        fold.states
    }

    /// Training examples from one story.
    pub fn story_examples(story: &Story, domain: &Domain) -> Vec<TrainingExample> {
        Self::examples(&story.canonical_steps(), domain.new_slot_store())
    }

    /// Training examples from one rule, with its slot conditions applied.
    ///
    /// Rules that begin mid-conversation (with an action) are skipped; their
    /// state before the first step is unknown.
    pub fn rule_examples(rule: &Rule, domain: &Domain) -> Vec<TrainingExample> {
        if rule.steps.first().map_or(true, |s| s.is_action()) {
            return Vec::new();
        }
        let mut slots = domain.new_slot_store();
        for condition in &rule.condition {
            let _ = slots.set(&condition.slot, &condition.value);
        }
        let steps: Vec<StoryStep> = rule
            .canonical_steps()
            .into_iter()
            .map(|step| match step {
                Step::Intent(name) => StoryStep::Intent(name),
                Step::Action(name) => StoryStep::Action(name),
            })
            .collect();
        Self::examples(&steps, slots)
    }

    fn examples(steps: &[StoryStep], slots: SlotStore) -> Vec<TrainingExample> {
        let mut fold = Fold::new(slots);
        let mut examples = Vec::new();
        for step in steps {
            match step {
                StoryStep::Intent(name) => fold.intent = Some(name.clone()),
                StoryStep::SlotWasSet(values) => {
                    for (name, value) in values {
                        let _ = fold.slots.set(name, value);
                    }
                }
                StoryStep::Action(name) => {
                    let mut history = fold.states.clone();
                    history.push(fold.current());
                    examples.push((history, name.clone()));
                    fold.action(name);
                }
            }
        }
        examples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dialogue::{Event, Intent, SlotCondition, SlotDefinition, SlotType};
    use crate::domain::foundation::SenderId;
    use std::sync::Arc;

    fn domain() -> Arc<Domain> {
        Arc::new(
            Domain::builder()
                .intent("greet")
                .intent("ask_hours")
                .slot(SlotDefinition::new("vip", SlotType::Boolean))
                .slot(SlotDefinition::new("note", SlotType::Text).with_influence(false))
                .response("utter_greet", "Hi!")
                .response("utter_hours", "9 to 5")
                .build()
                .unwrap(),
        )
    }

    fn state(prev: &str, intent: Option<&str>, vip: &str) -> DialogueState {
        DialogueState {
            prev_action: prev.to_string(),
            intent: intent.map(str::to_string),
            slots: [("vip".to_string(), vip.to_string())].into(),
        }
    }

    #[test]
    fn tracker_states_end_with_current_state() {
        let events = vec![
            Event::user_uttered("hi", Some(Intent::new("greet", 1.0)), vec![]),
            Event::action_executed("utter_greet"),
            Event::slot_set("vip", true),
            Event::slot_set("note", "ignored"),
        ];
        let tracker = DialogueStateTracker::replay(SenderId::new("u").unwrap(), domain(), events).unwrap();

        assert_eq!(
            StateFeaturizer::tracker_states(&tracker),
            vec![
                state(ACTION_LISTEN, Some("greet"), "unset"),
                state("utter_greet", Some("greet"), "true"),
            ]
        );
    }

    #[test]
    fn story_examples_match_runtime_states() {
        let story = Story::new(
            "greet",
            vec![StoryStep::Intent("greet".into()), StoryStep::Action("utter_greet".into())],
        );
        let examples = StateFeaturizer::story_examples(&story, &domain());

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0], (vec![state(ACTION_LISTEN, Some("greet"), "unset")], "utter_greet".to_string()));
        assert_eq!(examples[1].1, ACTION_LISTEN);
        assert_eq!(examples[1].0.len(), 2);
    }

    #[test]
    fn rule_conditions_seed_slots() {
        let rule = Rule::new("vip", vec![Step::intent("greet"), Step::action("utter_greet")])
            .when(SlotCondition::new("vip", true));
        let examples = StateFeaturizer::rule_examples(&rule, &domain());

        assert_eq!(examples[0].0[0].slots["vip"], "true");
    }

    #[test]
    fn rules_starting_with_action_are_skipped() {
        let rule = Rule::new("mid", vec![Step::action("utter_greet"), Step::action("utter_hours")]);
        assert!(StateFeaturizer::rule_examples(&rule, &domain()).is_empty());
    }
}
