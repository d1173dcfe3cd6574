//! HandleMessage command handler.
//!
//! Runs one conversational turn: interpret the text, record it, then let the
//! policy ensemble pick and execute actions until it chooses to listen.
//!
//! Recoverable problems (low confidence, a failing custom action, a runaway
//! policy loop) never fail the turn. They are reported as [`TurnIssue`]s and
//! the conversation continues with fallback behavior.

use std::sync::Arc;

use thiserror::Error;

use crate::application::{ActionExecutionFailed, ActionExecutor, BusyPolicy, Session, SessionManager};
use crate::domain::dialogue::{
    Action, DialogueStateTracker, Event, Intent, ParsedMessage, TrackerError,
    ACTION_SESSION_START, NLU_FALLBACK_INTENT,
};
use crate::domain::foundation::{DomainError, SenderId, Timestamp};
use crate::domain::policy::{PolicyEnsemble, ENSEMBLE_POLICY_NAME};
use crate::ports::{BotMessage, Interpreter, OutputChannel};

/// Default cap on actions selected for one inbound message.
pub const DEFAULT_MAX_ACTIONS_PER_TURN: usize = 10;

/// Default confidence below which an intent is replaced by `nlu_fallback`.
pub const DEFAULT_NLU_THRESHOLD: f64 = 0.3;

/// A message from a user.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender: SenderId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(sender: SenderId, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }
}

/// Errors that fail a turn outright.
#[derive(Debug, Error)]
pub enum HandleMessageError {
    /// Another turn for this sender is running and the busy policy is `Reject`.
    #[error("Session busy: {0}")]
    SessionBusy(SenderId),

    /// The stored conversation could not be loaded.
    #[error("Storage error: {0}")]
    Storage(#[from] DomainError),

    /// An event produced by a built-in step was rejected by the tracker.
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),
}

/// A problem recovered from during a turn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TurnIssue {
    #[error("interpreter failed: {0}")]
    InterpretationFailed(String),

    #[error("intent '{intent}' confidence {confidence:.2} below threshold {threshold:.2}")]
    InterpretationLowConfidence {
        intent: String,
        confidence: f64,
        threshold: f64,
    },

    #[error("interpreter returned undeclared intent '{0}'")]
    UnknownIntent(String),

    #[error("slot '{slot}' not filled from entity: {reason}")]
    SlotMappingRejected { slot: String, reason: String },

    #[error(transparent)]
    ActionFailed(ActionExecutionFailed),

    #[error("policy selected {limit} actions without listening")]
    PolicyLoopExceeded { limit: usize },

    #[error("completion of '{action}' discarded: conversation changed while it ran")]
    StaleCompletion { action: String },

    #[error("failed to persist conversation: {0}")]
    PersistenceFailed(String),

    #[error("failed to deliver message: {0}")]
    DeliveryFailed(String),
}

/// Outcome of one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    /// Bot messages, in the order they were produced.
    pub messages: Vec<BotMessage>,
    /// Names of the actions run, ending with `action_listen`.
    pub actions: Vec<String>,
    pub issues: Vec<TurnIssue>,
}

impl TurnReport {
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.text.as_str()).collect()
    }

    pub fn has_issue(&self, matches: impl Fn(&TurnIssue) -> bool) -> bool {
        self.issues.iter().any(matches)
    }
}

/// Tunables for turn handling.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub nlu_threshold: f64,
    pub max_actions_per_turn: usize,
    pub busy_policy: BusyPolicy,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            nlu_threshold: DEFAULT_NLU_THRESHOLD,
            max_actions_per_turn: DEFAULT_MAX_ACTIONS_PER_TURN,
            busy_policy: BusyPolicy::default(),
        }
    }
}

/// Handler for inbound user messages.
pub struct HandleMessageHandler {
    sessions: Arc<SessionManager>,
    interpreter: Arc<dyn Interpreter>,
    policy: Arc<PolicyEnsemble>,
    executor: Arc<ActionExecutor>,
    output: Arc<dyn OutputChannel>,
    settings: TurnSettings,
}

impl HandleMessageHandler {
    pub fn new(
        sessions: Arc<SessionManager>,
        interpreter: Arc<dyn Interpreter>,
        policy: Arc<PolicyEnsemble>,
        executor: Arc<ActionExecutor>,
        output: Arc<dyn OutputChannel>,
    ) -> Self {
        Self {
            sessions,
            interpreter,
            policy,
            executor,
            output,
            settings: TurnSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: TurnSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    pub async fn handle(&self, message: InboundMessage) -> Result<TurnReport, HandleMessageError> {
        let sender = message.sender;
        let session = self.sessions.get_or_create(&sender).await?;
        let _turn = session
            .acquire_turn(self.settings.busy_policy)
            .await
            .ok_or_else(|| HandleMessageError::SessionBusy(sender.clone()))?;

        let mut turn = Turn::default();

        let parsed = match self.interpreter.parse(&message.text).await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(sender = %sender, error = %e, "Interpreter failed, treating as no intent");
                turn.issue(TurnIssue::InterpretationFailed(e.to_string()));
                ParsedMessage::unrecognized(message.text.clone())
            }
        };

        {
            let mut tracker = session.tracker().write().await;

            if session_expired(&tracker, Timestamp::now()) {
                tracing::info!(sender = %sender, "Session expired, starting a new one");
                match self.executor.execute(&Action::SessionStart, &tracker.snapshot()).await {
                    Ok(events) => {
                        turn.record(&mut tracker, ACTION_SESSION_START, ENSEMBLE_POLICY_NAME, 1.0, events)?
                    }
                    Err(failure) => turn.issue(TurnIssue::ActionFailed(failure)),
                }
            }

            let parsed = self.sanitize(parsed, &tracker, &mut turn);
            let mut events = vec![Event::from_parse(&parsed)];
            events.extend(mapped_slots(&parsed, &tracker, &mut turn));
            tracker.append_all(events)?;
        }

        self.run_policy_loop(&session, &mut turn).await?;

        if let Err(e) = self.sessions.persist(&session).await {
            tracing::error!(sender = %sender, error = %e, "Failed to persist conversation");
            turn.issue(TurnIssue::PersistenceFailed(e.to_string()));
        }

        let mut report = turn.into_report(&sender);
        for message in &report.messages {
            if let Err(e) = self.output.send(message).await {
                tracing::warn!(sender = %sender, channel = self.output.name(), error = %e, "Delivery failed");
                report.issues.push(TurnIssue::DeliveryFailed(e.to_string()));
            }
        }

        session.touch();
        tracing::debug!(sender = %sender, actions = ?report.actions, issues = report.issues.len(), "Turn complete");
        Ok(report)
    }

    /// Maps unknown and low-confidence intents to `nlu_fallback` and drops
    /// undeclared entities.
    fn sanitize(&self, mut parsed: ParsedMessage, tracker: &DialogueStateTracker, turn: &mut Turn) -> ParsedMessage {
        let domain = tracker.domain();
        let confidence = parsed.confidence();

        let fallback = match &parsed.intent {
            None => true,
            Some(intent) if !domain.has_intent(&intent.name) => {
                tracing::warn!(intent = %intent.name, "Interpreter returned an undeclared intent");
                turn.issue(TurnIssue::UnknownIntent(intent.name.clone()));
                true
            }
            Some(intent) if intent.name != NLU_FALLBACK_INTENT && confidence < self.settings.nlu_threshold => {
                turn.issue(TurnIssue::InterpretationLowConfidence {
                    intent: intent.name.clone(),
                    confidence,
                    threshold: self.settings.nlu_threshold,
                });
                true
            }
            Some(_) => false,
        };
        if fallback {
            parsed.intent = Some(Intent::new(NLU_FALLBACK_INTENT, confidence));
        }

        parsed.entities.retain(|e| domain.has_entity(&e.entity));
        parsed
    }

    async fn run_policy_loop(&self, session: &Session, turn: &mut Turn) -> Result<(), HandleMessageError> {
        let limit = self.settings.max_actions_per_turn;
        let mut previous_failure = false;

        for _ in 0..limit {
            let snapshot = session.snapshot().await;
            let prediction = self.policy.select_next_action(&snapshot, previous_failure);
            let action_name = prediction.action.name().to_string();

            tracing::debug!(
                sender = %session.sender_id(),
                action = %action_name,
                policy = prediction.policy,
                confidence = prediction.confidence,
                "Action selected"
            );

            if prediction.action.is_listen() {
                let mut tracker = session.tracker().write().await;
                turn.record(&mut tracker, &action_name, prediction.policy, prediction.confidence, Vec::new())?;
                return Ok(());
            }

            // Custom actions run here without any tracker lock held.
            match self.executor.execute(&prediction.action, &snapshot).await {
                Ok(events) => {
                    let mut tracker = session.tracker().write().await;
                    if tracker.sequence() != snapshot.sequence() {
                        tracing::warn!(sender = %session.sender_id(), action = %action_name, "Discarding stale action completion");
                        turn.issue(TurnIssue::StaleCompletion { action: action_name });
                        previous_failure = false;
                        continue;
                    }
                    turn.record(&mut tracker, &action_name, prediction.policy, prediction.confidence, events)?;
                    previous_failure = false;
                }
                Err(failure) => {
                    tracing::warn!(sender = %session.sender_id(), error = %failure, "Action failed, falling back");
                    turn.issue(TurnIssue::ActionFailed(failure));
                    previous_failure = true;
                }
            }
        }

        tracing::warn!(sender = %session.sender_id(), limit, "Policy loop exceeded, forcing listen");
        turn.issue(TurnIssue::PolicyLoopExceeded { limit });
        let mut tracker = session.tracker().write().await;
        turn.record(&mut tracker, Action::Listen.name(), ENSEMBLE_POLICY_NAME, 1.0, Vec::new())?;
        Ok(())
    }
}

/// True when the previous user message is older than the session expiry.
fn session_expired(tracker: &DialogueStateTracker, now: Timestamp) -> bool {
    let Some(expiry) = tracker.domain().session_settings().expiration_secs() else {
        return false;
    };
    tracker
        .last_user_message_at()
        .and_then(|last| now.duration_since(&last).to_std().ok())
        .is_some_and(|idle| idle.as_secs() >= expiry)
}

/// `SlotSet` events for slots mapped from the message's entities, left to
/// right. Values the slot type rejects are skipped.
fn mapped_slots(parsed: &ParsedMessage, tracker: &DialogueStateTracker, turn: &mut Turn) -> Vec<Event> {
    let intent = parsed.intent.as_ref().map(|i| i.name.as_str());
    let store = tracker.slot_store();
    let mut events = Vec::new();

    for entity in &parsed.entities {
        for (slot, definition) in store.definitions() {
            if !definition.entity_for(intent).any(|name| name == entity.entity) {
                continue;
            }
            match store.check(slot, &entity.value) {
                Ok(value) => events.push(Event::slot_set(slot.clone(), value)),
                Err(e) => {
                    tracing::warn!(slot = %slot, error = %e, "Entity value rejected by slot");
                    turn.issue(TurnIssue::SlotMappingRejected {
                        slot: slot.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
    events
}

/// Accumulates what happened during one turn.
#[derive(Default)]
struct Turn {
    actions: Vec<String>,
    utterances: Vec<String>,
    issues: Vec<TurnIssue>,
}

impl Turn {
    fn issue(&mut self, issue: TurnIssue) {
        self.issues.push(issue);
    }

    /// Appends `ActionExecuted` followed by the action's events.
    fn record(
        &mut self,
        tracker: &mut DialogueStateTracker,
        action: &str,
        policy: &str,
        confidence: f64,
        events: Vec<Event>,
    ) -> Result<(), TrackerError> {
        let utterances: Vec<String> = events.iter().filter_map(|e| e.bot_text().map(str::to_string)).collect();

        let mut batch = Vec::with_capacity(events.len() + 1);
        batch.push(Event::action_predicted(action, policy, confidence));
        batch.extend(events);
        tracker.append_all(batch)?;

        self.actions.push(action.to_string());
        self.utterances.extend(utterances);
        Ok(())
    }

    fn into_report(self, recipient: &SenderId) -> TurnReport {
        TurnReport {
            messages: self
                .utterances
                .into_iter()
                .map(|text| BotMessage::new(recipient.clone(), text))
                .collect(),
            actions: self.actions,
            issues: self.issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{CollectingOutputChannel, InMemoryTrackerStore, MockInterpreter};
    use crate::application::ActionRegistry;
    use crate::domain::dialogue::{
        Domain, Entity, EventKind, Rule, SessionSettings, SlotDefinition, SlotMapping, SlotType, Step, TrainingData,
    };
    use crate::ports::{InterpreterError, TrackerStore};
    use serde_json::json;

    struct Fixture {
        handler: HandleMessageHandler,
        output: Arc<CollectingOutputChannel>,
        store: Arc<InMemoryTrackerStore>,
    }

    fn domain() -> Arc<Domain> {
        Arc::new(
            Domain::builder()
                .intent("greet")
                .intent("ask_hours")
                .intent("inform")
                .entity("name")
                .entity("colour")
                .slot(
                    SlotDefinition::new("name", SlotType::Text).with_mapping(SlotMapping::FromEntity {
                        entity: "name".into(),
                        intents: vec![],
                    }),
                )
                .response("utter_greet", "Hi {name}!")
                .response("utter_hours", "We're open 9 to 5.")
                .response("utter_default", "Sorry, I didn't get that.")
                .session(SessionSettings {
                    session_expiration_time: 60,
                    carry_over_slots_to_new_session: true,
                })
                .build()
                .unwrap(),
        )
    }

    fn fixture(interpreter: MockInterpreter) -> Fixture {
        let domain = domain();
        let training = TrainingData::new(
            vec![
                Rule::new("hours", vec![Step::intent("ask_hours"), Step::action("utter_hours")]),
                Rule::new("greet", vec![Step::intent("greet"), Step::action("utter_greet")]),
            ],
            vec![],
        );
        let store = Arc::new(InMemoryTrackerStore::new());
        let output = Arc::new(CollectingOutputChannel::new());
        let sessions = Arc::new(SessionManager::new(domain.clone(), store.clone()));
        let policy = Arc::new(PolicyEnsemble::from_training(&training, &domain, 5, 0.3));
        let executor = Arc::new(ActionExecutor::new(Arc::new(ActionRegistry::new())));

        let handler = HandleMessageHandler::new(sessions, Arc::new(interpreter), policy, executor, output.clone());
        Fixture { handler, output, store }
    }

    fn sender() -> SenderId {
        SenderId::new("u1").unwrap()
    }

    #[tokio::test]
    async fn rule_turn_utters_and_listens() {
        let f = fixture(MockInterpreter::new().with_intent("when are you open?", "ask_hours", 0.9));

        let report = f.handler.handle(InboundMessage::new(sender(), "when are you open?")).await.unwrap();

        assert_eq!(report.texts(), vec!["We're open 9 to 5."]);
        assert_eq!(report.actions, vec!["utter_hours", "action_listen"]);
        assert!(report.issues.is_empty());
        assert_eq!(f.output.texts_for(&sender()).await, vec!["We're open 9 to 5."]);
    }

    #[tokio::test]
    async fn turn_is_persisted() {
        let f = fixture(MockInterpreter::new().with_intent("hi", "greet", 0.9));

        f.handler.handle(InboundMessage::new(sender(), "hi")).await.unwrap();

        let events = f.store.load(&sender()).await.unwrap().unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.type_name()).collect();
        assert_eq!(kinds, vec!["user", "action", "bot", "action"]);
    }

    #[tokio::test]
    async fn low_confidence_becomes_nlu_fallback() {
        let f = fixture(MockInterpreter::new().with_intent("hmm", "greet", 0.1));

        let report = f.handler.handle(InboundMessage::new(sender(), "hmm")).await.unwrap();

        assert_eq!(report.texts(), vec!["Sorry, I didn't get that."]);
        assert!(report.has_issue(|i| matches!(i, TurnIssue::InterpretationLowConfidence { intent, .. } if intent == "greet")));
    }

    #[tokio::test]
    async fn undeclared_intent_becomes_nlu_fallback() {
        let f = fixture(MockInterpreter::new().with_intent("buy", "purchase", 0.95));

        let report = f.handler.handle(InboundMessage::new(sender(), "buy")).await.unwrap();

        assert_eq!(report.actions, vec!["action_default_fallback", "action_listen"]);
        assert!(report.has_issue(|i| matches!(i, TurnIssue::UnknownIntent(name) if name == "purchase")));
    }

    #[tokio::test]
    async fn interpreter_error_is_recovered() {
        let f = fixture(MockInterpreter::new().with_error("boom", InterpreterError::Unavailable("down".into())));

        let report = f.handler.handle(InboundMessage::new(sender(), "boom")).await.unwrap();

        assert!(report.has_issue(|i| matches!(i, TurnIssue::InterpretationFailed(_))));
        assert_eq!(report.texts(), vec!["Sorry, I didn't get that."]);
    }

    #[tokio::test]
    async fn entities_fill_mapped_slots() {
        let f = fixture(MockInterpreter::new().with_entities(
            "hi, I'm Ada",
            "greet",
            0.9,
            vec![Entity::new("name", "Ada", 8, 11), Entity::new("unknown", "x", 0, 2)],
        ));

        let report = f.handler.handle(InboundMessage::new(sender(), "hi, I'm Ada")).await.unwrap();

        assert_eq!(report.texts(), vec!["Hi Ada!"]);
        let events = f.store.load(&sender()).await.unwrap().unwrap();
        assert!(matches!(
            &events[1].kind,
            EventKind::SlotSet { name, value } if name == "name" && value == &json!("Ada")
        ));
        match &events[0].kind {
            EventKind::UserUttered { entities, .. } => assert_eq!(entities.len(), 1),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn expired_session_starts_new_one() {
        let f = fixture(MockInterpreter::new().with_intent("hi", "greet", 0.9));
        let two_hours_ago = Timestamp::now().minus_secs(7200);
        f.store
            .save(
                &sender(),
                &[
                    Event::at(
                        two_hours_ago,
                        EventKind::UserUttered {
                            text: "hi".into(),
                            intent: Some(Intent::new("greet", 0.9)),
                            entities: vec![],
                        },
                    ),
                    Event::at(two_hours_ago, EventKind::SlotSet { name: "name".into(), value: json!("Ada") }),
                ],
            )
            .await
            .unwrap();

        let report = f.handler.handle(InboundMessage::new(sender(), "hi")).await.unwrap();

        assert_eq!(report.actions[0], ACTION_SESSION_START);
        assert_eq!(report.texts(), vec!["Hi Ada!"]);
    }

    #[tokio::test]
    async fn reject_policy_surfaces_busy() {
        let f = fixture(MockInterpreter::new());
        let handler = f.handler.with_settings(TurnSettings {
            busy_policy: BusyPolicy::Reject,
            ..TurnSettings::default()
        });
        let session = handler.sessions.get_or_create(&sender()).await.unwrap();
        let _held = session.acquire_turn(BusyPolicy::Wait).await;

        let result = handler.handle(InboundMessage::new(sender(), "hi")).await;

        assert!(matches!(result, Err(HandleMessageError::SessionBusy(_))));
    }
}
