//! Dialogue state tracker.
//!
//! The tracker owns one conversation's event log. All derived state lives in
//! [`DerivedState`] and is produced by folding events in order, so
//! `DialogueStateTracker::replay(events)` always reconstructs exactly the
//! tracker that appended them.

use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use super::declaration::Domain;
use super::errors::TrackerError;
use super::event::{Event, EventKind};
use super::nlu::{Intent, ParsedMessage, NLU_FALLBACK_INTENT};
use super::slot::SlotStore;
use super::training::Step;
use crate::domain::foundation::{ConversationStatus, SenderId, StateMachine, Timestamp};

/// State derived from the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedState {
    slots: SlotStore,
    latest_message: Option<ParsedMessage>,
    latest_action: Option<String>,
    latest_bot_utterance: Option<String>,
    status: ConversationStatus,
    followup_action: Option<String>,
    /// Index of the first event after the most recent restart/session start.
    episode_start: usize,
}

impl DerivedState {
    fn initial(domain: &Domain) -> Self {
        Self {
            slots: domain.new_slot_store(),
            latest_message: None,
            latest_action: None,
            latest_bot_utterance: None,
            status: ConversationStatus::default(),
            followup_action: None,
            episode_start: 0,
        }
    }

    /// Applies one event. On error `self` is left untouched.
    fn apply(&mut self, event: &Event, index: usize) -> Result<(), TrackerError> {
        match &event.kind {
            EventKind::UserUttered { text, intent, entities } => {
                self.latest_message = Some(ParsedMessage {
                    text: text.clone(),
                    intent: intent.clone(),
                    entities: entities.clone(),
                    intent_ranking: intent.iter().cloned().collect(),
                });
            }
            EventKind::SlotSet { name, value } => {
                self.slots.set(name, value)?;
            }
            EventKind::ActionExecuted { name, .. } => {
                self.latest_action = Some(name.clone());
                self.followup_action = None;
            }
            EventKind::BotUttered { text, .. } => {
                self.latest_bot_utterance = Some(text.clone());
            }
            EventKind::Restarted | EventKind::SessionStarted => {
                self.slots.reset();
                self.latest_message = None;
                self.latest_action = None;
                self.latest_bot_utterance = None;
                self.status = ConversationStatus::Active;
                self.followup_action = None;
                self.episode_start = index + 1;
            }
            EventKind::AllSlotsReset => {
                self.slots.reset();
            }
            EventKind::ConversationPaused => {
                self.status = self.status.transition_to(ConversationStatus::Paused)?;
            }
            EventKind::ConversationResumed => {
                self.status = self.status.transition_to(ConversationStatus::Active)?;
            }
            EventKind::FollowupAction { name } => {
                self.followup_action = Some(name.clone());
            }
        }
        Ok(())
    }
}

/// Event log plus derived state for one sender.
#[derive(Debug, Clone)]
pub struct DialogueStateTracker {
    sender_id: SenderId,
    domain: Arc<Domain>,
    events: Vec<Event>,
    state: DerivedState,
}

impl DialogueStateTracker {
    /// Creates an empty tracker.
    pub fn new(sender_id: SenderId, domain: Arc<Domain>) -> Self {
        let state = DerivedState::initial(&domain);
        Self {
            sender_id,
            domain,
            events: Vec::new(),
            state,
        }
    }

    /// Rebuilds a tracker by folding a stored event log.
    pub fn replay(sender_id: SenderId, domain: Arc<Domain>, events: Vec<Event>) -> Result<Self, TrackerError> {
        let mut tracker = Self::new(sender_id, domain);
        for event in events {
            tracker.append(event)?;
        }
        Ok(tracker)
    }

    /// Appends one event. Rejected events leave the tracker unchanged.
    pub fn append(&mut self, event: Event) -> Result<(), TrackerError> {
        self.state.apply(&event, self.events.len())?;
        self.events.push(event);
        Ok(())
    }

    /// Appends a batch atomically: either every event is applied or none.
    pub fn append_all(&mut self, events: Vec<Event>) -> Result<(), TrackerError> {
        let next = self.fold_onto_copy(&events)?;
        self.state = next;
        self.events.extend(events);
        Ok(())
    }

    /// Checks that a batch would apply cleanly, without changing anything.
    pub fn check_all(&self, events: &[Event]) -> Result<(), TrackerError> {
        self.fold_onto_copy(events).map(|_| ())
    }

    fn fold_onto_copy(&self, events: &[Event]) -> Result<DerivedState, TrackerError> {
        let mut next = self.state.clone();
        for (offset, event) in events.iter().enumerate() {
            next.apply(event, self.events.len() + offset)?;
        }
        Ok(next)
    }

    pub fn sender_id(&self) -> &SenderId {
        &self.sender_id
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    /// Current slot values (last write wins per slot).
    pub fn current_slots(&self) -> &BTreeMap<String, Value> {
        self.state.slots.values()
    }

    pub fn slot_store(&self) -> &SlotStore {
        &self.state.slots
    }

    pub fn get_slot(&self, name: &str) -> Option<&Value> {
        self.state.slots.get(name)
    }

    /// Intent of the most recent user message in the current episode.
    pub fn latest_intent(&self) -> Option<&Intent> {
        self.state.latest_message.as_ref().and_then(|m| m.intent.as_ref())
    }

    pub fn latest_message(&self) -> Option<&ParsedMessage> {
        self.state.latest_message.as_ref()
    }

    pub fn latest_action_name(&self) -> Option<&str> {
        self.state.latest_action.as_deref()
    }

    pub fn latest_bot_utterance(&self) -> Option<&str> {
        self.state.latest_bot_utterance.as_deref()
    }

    pub fn status(&self) -> ConversationStatus {
        self.state.status
    }

    pub fn is_paused(&self) -> bool {
        !self.state.status.is_active()
    }

    /// Action forced by a pending `FollowupAction` event.
    pub fn followup_action(&self) -> Option<&str> {
        self.state.followup_action.as_deref()
    }

    /// The last `limit` events, most recent last.
    pub fn history(&self, limit: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(limit);
        &self.events[start..]
    }

    /// The full log, including events before restarts.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events since the most recent restart or session start.
    pub fn applied_events(&self) -> &[Event] {
        &self.events[self.state.episode_start..]
    }

    /// Monotonic sequence number: the number of events ever appended.
    pub fn sequence(&self) -> u64 {
        self.events.len() as u64
    }

    /// Time of the most recent user message, across sessions.
    pub fn last_user_message_at(&self) -> Option<Timestamp> {
        self.events
            .iter()
            .rev()
            .find(|e| matches!(e.kind, EventKind::UserUttered { .. }))
            .map(|e| e.timestamp)
    }

    /// The `(intent, action)` step history of the current episode.
    pub fn turn_steps(&self) -> Vec<Step> {
        self.applied_events()
            .iter()
            .filter_map(|event| match &event.kind {
                EventKind::UserUttered { intent, .. } => Some(Step::Intent(
                    intent
                        .as_ref()
                        .map(|i| i.name.clone())
                        .unwrap_or_else(|| NLU_FALLBACK_INTENT.to_string()),
                )),
                EventKind::ActionExecuted { name, .. } => Some(Step::Action(name.clone())),
                _ => None,
            })
            .collect()
    }

    /// Immutable view handed to policies and custom actions.
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot(Arc::new(self.clone()))
    }
}

/// Cheaply clonable, read-only copy of a tracker.
#[derive(Debug, Clone)]
pub struct TrackerSnapshot(Arc<DialogueStateTracker>);

impl Deref for TrackerSnapshot {
    type Target = DialogueStateTracker;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DialogueStateTracker> for TrackerSnapshot {
    fn from(tracker: DialogueStateTracker) -> Self {
        TrackerSnapshot(Arc::new(tracker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dialogue::slot::{SlotDefinition, SlotType};
    use serde_json::json;

    fn domain() -> Arc<Domain> {
        Arc::new(
            Domain::builder()
                .intent("greet")
                .intent("ask_hours")
                .slot(SlotDefinition::new("name", SlotType::Text))
                .slot(SlotDefinition::new("vip", SlotType::Boolean).with_initial_value(false))
                .response("utter_hours", "We're open 9 to 5.")
                .build()
                .unwrap(),
        )
    }

    fn tracker() -> DialogueStateTracker {
        DialogueStateTracker::new(SenderId::new("u1").unwrap(), domain())
    }

    #[test]
    fn slots_are_last_write_wins() {
        let mut t = tracker();
        t.append(Event::slot_set("name", "Ada")).unwrap();
        t.append(Event::slot_set("name", "Grace")).unwrap();

        assert_eq!(t.get_slot("name"), Some(&json!("Grace")));
        assert_eq!(t.current_slots()["vip"], json!(false));
    }

    #[test]
    fn unknown_slot_is_rejected_without_mutation() {
        let mut t = tracker();
        let err = t.append(Event::slot_set("colour", "red")).unwrap_err();

        assert_eq!(err, TrackerError::UnknownSlot("colour".into()));
        assert!(t.events().is_empty());
        assert_eq!(t.sequence(), 0);
    }

    #[test]
    fn latest_intent_tracks_user_messages() {
        let mut t = tracker();
        assert!(t.latest_intent().is_none());

        t.append(Event::user_uttered("hi", Some(Intent::new("greet", 0.95)), vec![])).unwrap();
        t.append(Event::user_uttered("hours?", Some(Intent::new("ask_hours", 0.9)), vec![]))
            .unwrap();

        assert_eq!(t.latest_intent().unwrap().name, "ask_hours");
    }

    #[test]
    fn history_returns_most_recent_last() {
        let mut t = tracker();
        t.append(Event::action_executed("action_listen")).unwrap();
        t.append(Event::user_uttered("hi", Some(Intent::new("greet", 1.0)), vec![])).unwrap();
        t.append(Event::bot_uttered("hello")).unwrap();

        let history = t.history(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].bot_text(), Some("hello"));
        assert_eq!(t.history(10).len(), 3);
    }

    #[test]
    fn restart_resets_state_but_keeps_log() {
        let mut t = tracker();
        t.append(Event::user_uttered("hi", Some(Intent::new("greet", 1.0)), vec![])).unwrap();
        t.append(Event::slot_set("vip", true)).unwrap();
        t.append(Event::restarted()).unwrap();

        assert_eq!(t.get_slot("vip"), Some(&json!(false)));
        assert!(t.latest_intent().is_none());
        assert_eq!(t.events().len(), 3);
        assert!(t.applied_events().is_empty());
    }

    #[test]
    fn all_slots_reset_keeps_latest_message() {
        let mut t = tracker();
        t.append(Event::user_uttered("hi", Some(Intent::new("greet", 1.0)), vec![])).unwrap();
        t.append(Event::slot_set("name", "Ada")).unwrap();
        t.append(Event::all_slots_reset()).unwrap();

        assert_eq!(t.get_slot("name"), Some(&Value::Null));
        assert_eq!(t.latest_intent().unwrap().name, "greet");
    }

    #[test]
    fn pause_and_resume() {
        let mut t = tracker();
        t.append(Event::paused()).unwrap();
        assert!(t.is_paused());
        assert!(matches!(
            t.append(Event::paused()),
            Err(TrackerError::InvalidTransition(_))
        ));
        t.append(Event::resumed()).unwrap();
        assert!(!t.is_paused());
    }

    #[test]
    fn followup_is_cleared_by_next_action() {
        let mut t = tracker();
        t.append(Event::followup("utter_hours")).unwrap();
        assert_eq!(t.followup_action(), Some("utter_hours"));

        t.append(Event::action_executed("utter_hours")).unwrap();
        assert_eq!(t.followup_action(), None);
        assert_eq!(t.latest_action_name(), Some("utter_hours"));
    }

    #[test]
    fn append_all_is_atomic() {
        let mut t = tracker();
        let result = t.append_all(vec![Event::slot_set("name", "Ada"), Event::slot_set("colour", "red")]);

        assert!(result.is_err());
        assert_eq!(t.get_slot("name"), Some(&Value::Null));
        assert!(t.events().is_empty());
    }

    #[test]
    fn check_all_does_not_mutate() {
        let t = tracker();
        assert!(t.check_all(&[Event::slot_set("name", "Ada")]).is_ok());
        assert!(t.check_all(&[Event::slot_set("vip", "nope")]).is_err());
        assert_eq!(t.get_slot("name"), Some(&Value::Null));
    }

    #[test]
    fn replay_reconstructs_state() {
        let mut t = tracker();
        t.append(Event::user_uttered("hi", Some(Intent::new("greet", 1.0)), vec![])).unwrap();
        t.append(Event::slot_set("name", "Ada")).unwrap();
        t.append(Event::action_executed("utter_hours")).unwrap();
        t.append(Event::paused()).unwrap();

        let replayed = DialogueStateTracker::replay(t.sender_id().clone(), domain(), t.events().to_vec()).unwrap();

        assert_eq!(replayed.current_slots(), t.current_slots());
        assert_eq!(replayed.latest_action_name(), t.latest_action_name());
        assert_eq!(replayed.is_paused(), t.is_paused());
        assert_eq!(replayed.sequence(), t.sequence());
    }

    #[test]
    fn turn_steps_cover_current_episode() {
        let mut t = tracker();
        t.append(Event::user_uttered("old", Some(Intent::new("greet", 1.0)), vec![])).unwrap();
        t.append(Event::restarted()).unwrap();
        t.append(Event::action_executed("action_listen")).unwrap();
        t.append(Event::user_uttered("hours?", Some(Intent::new("ask_hours", 0.9)), vec![]))
            .unwrap();
        t.append(Event::user_uttered("???", None, vec![])).unwrap();

        assert_eq!(
            t.turn_steps(),
            vec![
                Step::Action("action_listen".into()),
                Step::Intent("ask_hours".into()),
                Step::Intent(NLU_FALLBACK_INTENT.into()),
            ]
        );
    }

    #[test]
    fn snapshot_is_detached_from_tracker() {
        let mut t = tracker();
        let snapshot = t.snapshot();
        t.append(Event::slot_set("name", "Ada")).unwrap();

        assert_eq!(snapshot.get_slot("name"), Some(&Value::Null));
        assert_eq!(snapshot.sequence(), 0);
    }
}
