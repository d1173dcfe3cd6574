//! Training data: rules and stories.
//!
//! ```yaml
//! rules:
//!   - rule: answer opening hours
//!     steps:
//!       - intent: ask_hours
//!       - action: utter_hours
//! stories:
//!   - story: order lookup
//!     steps:
//!       - intent: check_order
//!       - slot_was_set:
//!           - order_id: "1234"
//!       - action: action_check_order_status
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::action::ACTION_LISTEN;
use super::declaration::Domain;
use super::errors::DomainLoadError;
use super::slot::SlotCondition;

/// One element of the `(intent, action)` history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Intent(String),
    Action(String),
}

impl Step {
    pub fn intent(name: impl Into<String>) -> Self {
        Step::Intent(name.into())
    }

    pub fn action(name: impl Into<String>) -> Self {
        Step::Action(name.into())
    }

    pub fn is_action(&self) -> bool {
        matches!(self, Step::Action(_))
    }

    pub fn is_listen(&self) -> bool {
        matches!(self, Step::Action(name) if name == ACTION_LISTEN)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Intent(name) => write!(f, "intent:{}", name),
            Step::Action(name) => write!(f, "action:{}", name),
        }
    }
}

/// A story step, which may also record slot assignments.
#[derive(Debug, Clone, PartialEq)]
pub enum StoryStep {
    Intent(String),
    Action(String),
    SlotWasSet(BTreeMap<String, Value>),
}

/// Inserts the implicit `action_listen` between an action and a following
/// intent, and optionally after a trailing action.
fn with_implicit_listens<I>(steps: I, trailing_listen: bool) -> Vec<Step>
where
    I: IntoIterator<Item = Step>,
{
    let mut out: Vec<Step> = Vec::new();
    for step in steps {
        let needs_listen = matches!(step, Step::Intent(_))
            && out.last().is_some_and(|prev| prev.is_action() && !prev.is_listen());
        if needs_listen {
            out.push(Step::action(ACTION_LISTEN));
        }
        out.push(step);
    }
    if trailing_listen && out.last().is_some_and(|last| last.is_action() && !last.is_listen()) {
        out.push(Step::action(ACTION_LISTEN));
    }
    out
}

/// A deterministic conversation pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub condition: Vec<SlotCondition>,
    pub steps: Vec<Step>,
    /// When true the bot listens after the last step.
    pub wait_for_user_input: bool,
}

impl Rule {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            condition: Vec::new(),
            steps,
            wait_for_user_input: true,
        }
    }

    pub fn when(mut self, condition: SlotCondition) -> Self {
        self.condition.push(condition);
        self
    }

    pub fn continue_without_listening(mut self) -> Self {
        self.wait_for_user_input = false;
        self
    }

    /// Steps with implicit `action_listen`s made explicit.
    pub fn canonical_steps(&self) -> Vec<Step> {
        with_implicit_listens(self.steps.iter().cloned(), self.wait_for_user_input)
    }
}

/// An example conversation used to train the learned policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub name: String,
    pub steps: Vec<StoryStep>,
}

impl Story {
    pub fn new(name: impl Into<String>, steps: Vec<StoryStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Steps with implicit listens; a story always ends listening.
    pub fn canonical_steps(&self) -> Vec<StoryStep> {
        let mut out: Vec<StoryStep> = Vec::new();
        let mut last_action: Option<&str> = None;
        for step in &self.steps {
            match step {
                StoryStep::Intent(_) => {
                    if last_action.is_some_and(|name| name != ACTION_LISTEN) {
                        out.push(StoryStep::Action(ACTION_LISTEN.to_string()));
                    }
                    last_action = None;
                }
                StoryStep::Action(name) => last_action = Some(name.as_str()),
                StoryStep::SlotWasSet(_) => {}
            }
            out.push(step.clone());
        }
        if last_action.is_some_and(|name| name != ACTION_LISTEN) {
            out.push(StoryStep::Action(ACTION_LISTEN.to_string()));
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct StepEntry {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    slot_was_set: Option<Vec<BTreeMap<String, Value>>>,
}

impl StepEntry {
    fn into_story_step(self, location: &str) -> Result<StoryStep, DomainLoadError> {
        match (self.intent, self.action, self.slot_was_set) {
            (Some(intent), None, None) => Ok(StoryStep::Intent(intent)),
            (None, Some(action), None) => Ok(StoryStep::Action(action)),
            (None, None, Some(slots)) => Ok(StoryStep::SlotWasSet(slots.into_iter().flatten().collect())),
            _ => Err(DomainLoadError::parse(
                "training data",
                format!("{}: each step needs exactly one of intent, action, slot_was_set", location),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    rule: String,
    #[serde(default)]
    condition: Vec<SlotCondition>,
    steps: Vec<StepEntry>,
    #[serde(default = "default_wait_for_user_input")]
    wait_for_user_input: bool,
}

fn default_wait_for_user_input() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct StoryEntry {
    story: String,
    steps: Vec<StepEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct TrainingFile {
    #[serde(default)]
    rules: Vec<RuleEntry>,
    #[serde(default)]
    stories: Vec<StoryEntry>,
}

/// Rules and stories loaded from YAML.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingData {
    pub rules: Vec<Rule>,
    pub stories: Vec<Story>,
}

impl TrainingData {
    pub fn new(rules: Vec<Rule>, stories: Vec<Story>) -> Self {
        Self { rules, stories }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, DomainLoadError> {
        let file: TrainingFile =
            serde_yaml::from_str(yaml).map_err(|e| DomainLoadError::parse("training data", e))?;

        let mut rules = Vec::with_capacity(file.rules.len());
        for entry in file.rules {
            let location = format!("rule '{}'", entry.rule);
            let mut steps = Vec::with_capacity(entry.steps.len());
            for step in entry.steps {
                steps.push(match step.into_story_step(&location)? {
                    StoryStep::Intent(name) => Step::Intent(name),
                    StoryStep::Action(name) => Step::Action(name),
                    StoryStep::SlotWasSet(_) => {
                        return Err(DomainLoadError::parse(
                            "training data",
                            format!("{}: use `condition` instead of slot_was_set", location),
                        ))
                    }
                });
            }
            rules.push(Rule {
                name: entry.rule,
                condition: entry.condition,
                steps,
                wait_for_user_input: entry.wait_for_user_input,
            });
        }

        let mut stories = Vec::with_capacity(file.stories.len());
        for entry in file.stories {
            let location = format!("story '{}'", entry.story);
            let steps = entry
                .steps
                .into_iter()
                .map(|step| step.into_story_step(&location))
                .collect::<Result<Vec<_>, _>>()?;
            stories.push(Story::new(entry.story, steps));
        }

        Ok(Self { rules, stories })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainLoadError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| DomainLoadError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&yaml)
    }

    /// Appends another set of rules and stories.
    pub fn merge(mut self, other: TrainingData) -> Self {
        self.rules.extend(other.rules);
        self.stories.extend(other.stories);
        self
    }

    /// Checks every intent, action and slot reference against the domain.
    pub fn validate(&self, domain: &Domain) -> Result<(), DomainLoadError> {
        for rule in &self.rules {
            let location = format!("rule '{}'", rule.name);
            if rule.steps.is_empty() {
                return Err(DomainLoadError::parse(
                    "training data",
                    format!("{} has no steps", location),
                ));
            }
            for condition in &rule.condition {
                check_slot(domain, &condition.slot, &condition.value, &location)?;
            }
            for step in &rule.steps {
                match step {
                    Step::Intent(name) => check_intent(domain, name, &location)?,
                    Step::Action(name) => check_action(domain, name, &location)?,
                }
            }
        }

        for story in &self.stories {
            let location = format!("story '{}'", story.name);
            for step in &story.steps {
                match step {
                    StoryStep::Intent(name) => check_intent(domain, name, &location)?,
                    StoryStep::Action(name) => check_action(domain, name, &location)?,
                    StoryStep::SlotWasSet(slots) => {
                        for (slot, value) in slots {
                            check_slot(domain, slot, value, &location)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_intent(domain: &Domain, name: &str, location: &str) -> Result<(), DomainLoadError> {
    if domain.has_intent(name) {
        Ok(())
    } else {
        Err(DomainLoadError::unknown_intent(name, location))
    }
}

fn check_action(domain: &Domain, name: &str, location: &str) -> Result<(), DomainLoadError> {
    domain.resolve_action(name, location).map(|_| ())
}

fn check_slot(domain: &Domain, slot: &str, value: &Value, location: &str) -> Result<(), DomainLoadError> {
    let store = domain.new_slot_store();
    store.check(slot, value).map(|_| ()).map_err(|e| match e {
        super::errors::TrackerError::UnknownSlot(_) => DomainLoadError::unknown_slot(slot, location),
        other => DomainLoadError::InvalidSlot {
            slot: slot.to_string(),
            reason: format!("{}: {}", location, other),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dialogue::slot::{SlotDefinition, SlotType};
    use serde_json::json;

    fn domain() -> Domain {
        Domain::builder()
            .intent("greet")
            .intent("ask_hours")
            .slot(SlotDefinition::new("vip", SlotType::Boolean))
            .response("utter_greet", "Hi!")
            .response("utter_hours", "9 to 5")
            .build()
            .unwrap()
    }

    mod canonical_steps {
        use super::*;

        #[test]
        fn rule_gets_trailing_listen() {
            let rule = Rule::new("hours", vec![Step::intent("ask_hours"), Step::action("utter_hours")]);
            assert_eq!(
                rule.canonical_steps(),
                vec![
                    Step::intent("ask_hours"),
                    Step::action("utter_hours"),
                    Step::action(ACTION_LISTEN),
                ]
            );
        }

        #[test]
        fn listen_is_inserted_before_following_intent() {
            let rule = Rule::new(
                "two turns",
                vec![
                    Step::intent("greet"),
                    Step::action("utter_greet"),
                    Step::intent("ask_hours"),
                    Step::action("utter_hours"),
                ],
            )
            .continue_without_listening();

            let steps = rule.canonical_steps();
            assert_eq!(steps[2], Step::action(ACTION_LISTEN));
            assert_eq!(steps.last(), Some(&Step::action("utter_hours")));
        }

        #[test]
        fn story_ends_listening() {
            let story = Story::new(
                "s",
                vec![
                    StoryStep::Intent("greet".into()),
                    StoryStep::SlotWasSet(BTreeMap::new()),
                    StoryStep::Action("utter_greet".into()),
                ],
            );
            assert_eq!(
                story.canonical_steps().last(),
                Some(&StoryStep::Action(ACTION_LISTEN.into()))
            );
        }
    }

    mod yaml {
        use super::*;

        const TRAINING: &str = r#"
rules:
  - rule: greet vip
    condition:
      - slot: vip
        value: true
    steps:
      - intent: greet
      - action: utter_greet
    wait_for_user_input: false
stories:
  - story: hours
    steps:
      - intent: ask_hours
      - slot_was_set:
          - vip: true
      - action: utter_hours
"#;

        #[test]
        fn parses_rules_and_stories() {
            let data = TrainingData::from_yaml(TRAINING).unwrap();

            assert_eq!(data.rules.len(), 1);
            let rule = &data.rules[0];
            assert!(!rule.wait_for_user_input);
            assert_eq!(rule.condition, vec![SlotCondition::new("vip", true)]);

            let story = &data.stories[0];
            assert_eq!(story.steps[1], StoryStep::SlotWasSet([("vip".to_string(), json!(true))].into()));
            assert!(data.validate(&domain()).is_ok());
        }

        #[test]
        fn step_with_two_keys_is_rejected() {
            let yaml = "rules:\n  - rule: bad\n    steps:\n      - intent: greet\n        action: utter_greet\n";
            assert!(matches!(TrainingData::from_yaml(yaml), Err(DomainLoadError::Parse { .. })));
        }
    }

    mod validate {
        use super::*;

        #[test]
        fn unknown_intent_is_fatal() {
            let data = TrainingData::new(
                vec![Rule::new("r", vec![Step::intent("goodbye"), Step::action("utter_greet")])],
                vec![],
            );
            assert!(matches!(
                data.validate(&domain()),
                Err(DomainLoadError::UnknownIntent { intent, .. }) if intent == "goodbye"
            ));
        }

        #[test]
        fn unknown_action_is_fatal() {
            let data = TrainingData::new(
                vec![],
                vec![Story::new(
                    "s",
                    vec![StoryStep::Intent("greet".into()), StoryStep::Action("utter_bye".into())],
                )],
            );
            assert!(matches!(
                data.validate(&domain()),
                Err(DomainLoadError::UnknownAction { action, .. }) if action == "utter_bye"
            ));
        }

        #[test]
        fn unknown_condition_slot_is_fatal() {
            let data = TrainingData::new(
                vec![Rule::new("r", vec![Step::intent("greet"), Step::action("utter_greet")])
                    .when(SlotCondition::new("tier", "gold"))],
                vec![],
            );
            assert!(matches!(
                data.validate(&domain()),
                Err(DomainLoadError::UnknownSlot { slot, .. }) if slot == "tier"
            ));
        }

        #[test]
        fn builtin_actions_are_allowed() {
            let data = TrainingData::new(
                vec![Rule::new("r", vec![Step::intent("greet"), Step::action("action_restart")])],
                vec![],
            );
            assert!(data.validate(&domain()).is_ok());
        }
    }
}
