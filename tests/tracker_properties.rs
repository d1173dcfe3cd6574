//! Property tests for tracker event folding.
//!
//! Derived state is a pure fold over the event log, so replaying a stored
//! log must reproduce exactly the state built up incrementally, and slot
//! values always reflect the last write.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use colloquy::domain::dialogue::{DialogueStateTracker, Domain, Event, Intent};
use colloquy::domain::foundation::SenderId;

const SLOTS: [&str; 3] = ["city", "cuisine", "party_size"];

fn domain() -> Arc<Domain> {
    Arc::new(
        Domain::from_yaml(
            r#"
intents: [inform]
slots:
  city:
    type: text
  cuisine:
    type: text
  party_size:
    type: any
responses:
  utter_ok:
    - text: "ok"
"#,
        )
        .unwrap(),
    )
}

fn sender() -> SenderId {
    SenderId::new("prop").unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Set(usize, String),
    User,
    Action,
    Bot,
    Pause,
    Resume,
    ResetSlots,
    Restart,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..SLOTS.len(), "[a-z]{1,8}").prop_map(|(slot, value)| Op::Set(slot, value)),
        2 => Just(Op::User),
        2 => Just(Op::Action),
        1 => Just(Op::Bot),
        1 => Just(Op::Pause),
        1 => Just(Op::Resume),
        1 => Just(Op::ResetSlots),
        1 => Just(Op::Restart),
    ]
}

fn to_event(op: &Op) -> Event {
    match op {
        Op::Set(slot, value) => Event::slot_set(SLOTS[*slot], value.as_str()),
        Op::User => Event::user_uttered("hi", Some(Intent::new("inform", 0.8)), vec![]),
        Op::Action => Event::action_executed("utter_ok"),
        Op::Bot => Event::bot_uttered("ok"),
        Op::Pause => Event::paused(),
        Op::Resume => Event::resumed(),
        Op::ResetSlots => Event::all_slots_reset(),
        Op::Restart => Event::restarted(),
    }
}

/// Appends events one by one, skipping the ones the tracker rejects
/// (e.g. pausing an already paused conversation).
fn build_incrementally(ops: &[Op]) -> DialogueStateTracker {
    let mut tracker = DialogueStateTracker::new(sender(), domain());
    for op in ops {
        let _ = tracker.append(to_event(op));
    }
    tracker
}

proptest! {
    #[test]
    fn replay_reproduces_incremental_state(ops in prop::collection::vec(op(), 0..60)) {
        let live = build_incrementally(&ops);
        let replayed = DialogueStateTracker::replay(sender(), domain(), live.events().to_vec()).unwrap();

        prop_assert_eq!(replayed.events(), live.events());
        prop_assert_eq!(replayed.current_slots(), live.current_slots());
        prop_assert_eq!(replayed.is_paused(), live.is_paused());
        prop_assert_eq!(replayed.latest_action_name(), live.latest_action_name());
        prop_assert_eq!(replayed.turn_steps(), live.turn_steps());
        prop_assert_eq!(replayed.sequence(), live.sequence());
    }

    #[test]
    fn last_slot_write_wins(writes in prop::collection::vec((0..SLOTS.len(), "[a-z]{1,8}"), 1..40)) {
        let ops: Vec<Op> = writes.iter().cloned().map(|(slot, value)| Op::Set(slot, value)).collect();
        let tracker = build_incrementally(&ops);

        let mut expected: BTreeMap<String, Value> = SLOTS.iter().map(|s| (s.to_string(), Value::Null)).collect();
        for (slot, value) in &writes {
            expected.insert(SLOTS[*slot].to_string(), json!(value));
        }
        prop_assert_eq!(tracker.current_slots(), &expected);
    }

    #[test]
    fn restart_clears_slots_but_keeps_log(ops in prop::collection::vec(op(), 0..40)) {
        let mut tracker = build_incrementally(&ops);
        let before = tracker.events().len();

        tracker.append(Event::restarted()).unwrap();

        prop_assert_eq!(tracker.events().len(), before + 1);
        prop_assert!(tracker.current_slots().values().all(Value::is_null));
        prop_assert!(!tracker.is_paused());
        prop_assert!(tracker.turn_steps().is_empty());
    }

    #[test]
    fn rejected_batch_leaves_tracker_unchanged(ops in prop::collection::vec(op(), 0..40)) {
        let mut tracker = build_incrementally(&ops);
        let slots = tracker.current_slots().clone();
        let len = tracker.events().len();

        let result = tracker.append_all(vec![
            Event::slot_set("city", "Paris"),
            Event::slot_set("not_a_slot", "x"),
        ]);

        prop_assert!(result.is_err());
        prop_assert_eq!(tracker.events().len(), len);
        prop_assert_eq!(tracker.current_slots(), &slots);
    }
}
