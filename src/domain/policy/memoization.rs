//! Memoization policy - the learned policy.
//!
//! Training counts, for every action in the training data, how often it
//! follows each featurized window of up to `max_history` states. Prediction
//! looks up the longest window present in the tracker and backs off to
//! shorter ones. The score of an action is its relative frequency for the
//! matched window.

use std::collections::{BTreeMap, HashMap};

use crate::domain::dialogue::{DialogueStateTracker, Domain, TrainingData};

use super::featurizer::{DialogueState, StateFeaturizer, TrainingExample};
use super::{Policy, Prediction};

pub const MEMOIZATION_POLICY_NAME: &str = "memoization";
pub const DEFAULT_MAX_HISTORY: usize = 5;
pub const DEFAULT_CORE_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct MemoizationPolicy {
    max_history: usize,
    core_threshold: f64,
    lookup: HashMap<Vec<DialogueState>, BTreeMap<String, usize>>,
}

impl MemoizationPolicy {
    pub fn new(max_history: usize, core_threshold: f64) -> Self {
        Self {
            max_history: max_history.max(1),
            core_threshold,
            lookup: HashMap::new(),
        }
    }

    /// Trains on every story and every rule that starts with an intent.
    pub fn train(mut self, training: &TrainingData, domain: &Domain) -> Self {
        let examples = training
            .stories
            .iter()
            .flat_map(|story| StateFeaturizer::story_examples(story, domain))
            .chain(
                training
                    .rules
                    .iter()
                    .flat_map(|rule| StateFeaturizer::rule_examples(rule, domain)),
            );
        for example in examples {
            self.add_example(example);
        }
        tracing::debug!(windows = self.lookup.len(), "Memoization policy trained");
        self
    }

    fn add_example(&mut self, (states, action): TrainingExample) {
        let longest = states.len().min(self.max_history);
        for len in 1..=longest {
            let window = states[states.len() - len..].to_vec();
            *self.lookup.entry(window).or_default().entry(action.clone()).or_insert(0) += 1;
        }
    }

    pub fn is_trained(&self) -> bool {
        !self.lookup.is_empty()
    }

    /// Best action and its relative frequency for the longest known window.
    pub fn score(&self, states: &[DialogueState]) -> Option<(String, f64)> {
        let longest = states.len().min(self.max_history);
        (1..=longest).rev().find_map(|len| {
            let counts = self.lookup.get(&states[states.len() - len..])?;
            let total: usize = counts.values().sum();
            let mut best: Option<(&String, usize)> = None;
            for (action, &count) in counts {
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((action, count));
                }
            }
            best.map(|(action, count)| (action.clone(), count as f64 / total as f64))
        })
    }
}

impl Default for MemoizationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY, DEFAULT_CORE_THRESHOLD)
    }
}

impl Policy for MemoizationPolicy {
    fn name(&self) -> &'static str {
        MEMOIZATION_POLICY_NAME
    }

    fn predict(&self, tracker: &DialogueStateTracker) -> Option<Prediction> {
        let states = StateFeaturizer::tracker_states(tracker);
        let (name, confidence) = self.score(&states)?;
        if confidence < self.core_threshold {
            tracing::debug!(action = %name, confidence, "Below core threshold");
            return None;
        }
        let action = tracker.domain().action_for_name(&name)?;
        Some(Prediction::new(action, confidence, MEMOIZATION_POLICY_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dialogue::{Action, Event, Intent, Story, StoryStep, ACTION_LISTEN};
    use crate::domain::foundation::SenderId;
    use std::sync::Arc;

    fn domain() -> Arc<Domain> {
        Arc::new(
            Domain::builder()
                .intent("greet")
                .intent("ask_hours")
                .response("utter_greet", "Hi!")
                .response("utter_hours", "9 to 5")
                .response("utter_hours_again", "Still 9 to 5")
                .build()
                .unwrap(),
        )
    }

    fn story(name: &str, steps: &[(&str, &str)]) -> Story {
        let steps = steps
            .iter()
            .map(|(kind, name)| match *kind {
                "intent" => StoryStep::Intent(name.to_string()),
                _ => StoryStep::Action(name.to_string()),
            })
            .collect();
        Story::new(name, steps)
    }

    fn tracker(events: Vec<Event>) -> DialogueStateTracker {
        DialogueStateTracker::replay(SenderId::new("u").unwrap(), domain(), events).unwrap()
    }

    fn user(intent: &str) -> Event {
        Event::user_uttered("text", Some(Intent::new(intent, 1.0)), vec![])
    }

    fn trained(stories: Vec<Story>, threshold: f64) -> MemoizationPolicy {
        MemoizationPolicy::new(DEFAULT_MAX_HISTORY, threshold)
            .train(&TrainingData::new(vec![], stories), &domain())
    }

    #[test]
    fn predicts_memorized_action() {
        let policy = trained(vec![story("hours", &[("intent", "ask_hours"), ("action", "utter_hours")])], 0.3);

        let prediction = policy.predict(&tracker(vec![user("ask_hours")])).unwrap();
        assert_eq!(prediction.action, Action::utter("utter_hours"));
        assert_eq!(prediction.confidence, 1.0);

        let after = tracker(vec![user("ask_hours"), Event::action_executed("utter_hours")]);
        assert_eq!(policy.predict(&after).unwrap().action, Action::Listen);
    }

    #[test]
    fn backs_off_to_shorter_window() {
        let policy = trained(vec![story("hours", &[("intent", "ask_hours"), ("action", "utter_hours")])], 0.3);

        // The greeting turn was never seen, but the latest state was.
        let t = tracker(vec![
            user("greet"),
            Event::action_executed("utter_greet"),
            Event::action_executed(ACTION_LISTEN),
            user("ask_hours"),
        ]);
        assert_eq!(policy.predict(&t).unwrap().action, Action::utter("utter_hours"));
    }

    #[test]
    fn score_is_relative_frequency() {
        let policy = trained(
            vec![
                story("a", &[("intent", "ask_hours"), ("action", "utter_hours")]),
                story("b", &[("intent", "ask_hours"), ("action", "utter_hours")]),
                story("c", &[("intent", "ask_hours"), ("action", "utter_hours_again")]),
            ],
            0.3,
        );
        let states = StateFeaturizer::tracker_states(&tracker(vec![user("ask_hours")]));
        let (action, score) = policy.score(&states).unwrap();

        assert_eq!(action, "utter_hours");
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn abstains_below_threshold() {
        let policy = trained(
            vec![
                story("a", &[("intent", "ask_hours"), ("action", "utter_hours")]),
                story("b", &[("intent", "ask_hours"), ("action", "utter_hours_again")]),
            ],
            0.9,
        );
        assert!(policy.predict(&tracker(vec![user("ask_hours")])).is_none());
    }

    #[test]
    fn unseen_state_abstains() {
        let policy = trained(vec![story("hours", &[("intent", "ask_hours"), ("action", "utter_hours")])], 0.3);
        assert!(policy.predict(&tracker(vec![user("greet")])).is_none());
    }

    #[test]
    fn untrained_policy_is_empty() {
        assert!(!MemoizationPolicy::default().is_trained());
    }
}
