//! Agent - the assembled dialogue engine.
//!
//! Wires the domain, training data, interpreter, tracker store, output
//! channel and custom actions into one object that handles messages.
//! Everything is validated once in [`AgentBuilder::build`]; a built agent
//! never encounters an undeclared intent, slot, or action in its training
//! data or registry.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::InMemoryTrackerStore;
use crate::config::AppConfig;
use crate::domain::dialogue::{Domain, DomainLoadError, Event, TrackerSnapshot, TrainingData};
use crate::domain::foundation::{DomainError, SenderId, Timestamp};
use crate::domain::policy::{PolicyEnsemble, DEFAULT_CORE_THRESHOLD, DEFAULT_MAX_HISTORY};
use crate::ports::{CustomActionHandler, Interpreter, OutputChannel, TrackerStore};

use super::{
    ActionExecutor, ActionRegistry, GetTrackerHandler, GetTrackerQuery, HandleMessageError,
    HandleMessageHandler, InboundMessage, SessionManager, SessionSweeper, SessionSweeperConfig, TurnReport,
    TurnSettings, DEFAULT_ACTION_TIMEOUT,
};

pub struct Agent {
    domain: Arc<Domain>,
    sessions: Arc<SessionManager>,
    handle_message: HandleMessageHandler,
    get_tracker: GetTrackerHandler,
    sweeper_config: SessionSweeperConfig,
}

impl Agent {
    pub fn builder(domain: Domain, interpreter: Arc<dyn Interpreter>, output: Arc<dyn OutputChannel>) -> AgentBuilder {
        AgentBuilder::new(domain, interpreter, output)
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Runs one turn for an inbound message.
    pub async fn handle_message(&self, message: InboundMessage) -> Result<TurnReport, HandleMessageError> {
        self.handle_message.handle(message).await
    }

    /// Read-only view of a conversation, `None` if the sender is unknown.
    pub async fn tracker(&self, sender: &SenderId) -> Result<Option<TrackerSnapshot>, DomainError> {
        self.get_tracker.handle(GetTrackerQuery::new(sender.clone())).await
    }

    /// Appends externally produced events (for example a pause requested by
    /// an operator) and persists the log.
    ///
    /// This does not wait for a running turn. A custom action still in
    /// flight for the sender will have its completion discarded as stale.
    pub async fn inject_events(&self, sender: &SenderId, events: Vec<Event>) -> Result<(), DomainError> {
        let session = self.sessions.get_or_create(sender).await?;
        session.tracker().write().await.append_all(events)?;
        session.touch();
        self.sessions.persist(&session).await.map(|_| ())
    }

    pub async fn evict_idle(&self, now: Timestamp, timeout: Duration) -> usize {
        self.sessions.evict_idle(now, timeout).await
    }

    /// A sweeper over this agent's sessions, ready to `run`.
    pub fn sweeper(&self) -> SessionSweeper {
        SessionSweeper::with_config(self.sessions.clone(), self.sweeper_config.clone())
    }

    /// Saves every live session with unsaved events. Returns the number
    /// written.
    pub async fn flush(&self) -> Result<usize, DomainError> {
        self.sessions.flush_all().await
    }
}

pub struct AgentBuilder {
    domain: Domain,
    interpreter: Arc<dyn Interpreter>,
    output: Arc<dyn OutputChannel>,
    store: Option<Arc<dyn TrackerStore>>,
    training: TrainingData,
    registry: ActionRegistry,
    settings: TurnSettings,
    max_history: usize,
    core_threshold: f64,
    action_timeout: Duration,
    sweeper_config: SessionSweeperConfig,
}

impl AgentBuilder {
    pub fn new(domain: Domain, interpreter: Arc<dyn Interpreter>, output: Arc<dyn OutputChannel>) -> Self {
        Self {
            domain,
            interpreter,
            output,
            store: None,
            training: TrainingData::default(),
            registry: ActionRegistry::new(),
            settings: TurnSettings::default(),
            max_history: DEFAULT_MAX_HISTORY,
            core_threshold: DEFAULT_CORE_THRESHOLD,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            sweeper_config: SessionSweeperConfig::default(),
        }
    }

    /// Applies policy, action, and session settings from configuration.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.max_history = config.policy.max_history;
        self.core_threshold = config.policy.core_threshold;
        self.settings = TurnSettings {
            nlu_threshold: config.policy.nlu_threshold,
            max_actions_per_turn: config.policy.max_actions_per_turn,
            busy_policy: config.sessions.busy_policy,
        };
        self.action_timeout = config.actions.timeout();
        self.sweeper_config = SessionSweeperConfig::default()
            .with_interval(config.sessions.sweep_interval())
            .with_idle_timeout(config.sessions.idle_timeout());
        self
    }

    /// Tracker store; defaults to an in-memory store.
    pub fn store(mut self, store: Arc<dyn TrackerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn training(mut self, training: TrainingData) -> Self {
        self.training = self.training.merge(training);
        self
    }

    pub fn action(mut self, handler_id: impl Into<String>, handler: Arc<dyn CustomActionHandler>) -> Self {
        self.registry.register(handler_id, handler);
        self
    }

    pub fn settings(mut self, settings: TurnSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    pub fn memoization(mut self, max_history: usize, core_threshold: f64) -> Self {
        self.max_history = max_history;
        self.core_threshold = core_threshold;
        self
    }

    /// Validates training data and registrations against the domain and
    /// assembles the agent.
    ///
    /// # Errors
    ///
    /// Returns a `DomainLoadError` if training data or a registered handler
    /// references something the domain does not declare.
    pub fn build(self) -> Result<Agent, DomainLoadError> {
        let domain = Arc::new(self.domain);
        self.training.validate(&domain)?;
        self.registry.validate(&domain)?;

        for name in self.registry.missing_handlers(&domain) {
            tracing::warn!(action = name, "Custom action has no registered handler");
        }

        let policy = PolicyEnsemble::from_training(&self.training, &domain, self.max_history, self.core_threshold);
        tracing::info!(
            rules = self.training.rules.len(),
            stories = self.training.stories.len(),
            policies = ?policy.policy_names(),
            "Agent policies trained"
        );

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryTrackerStore::new()) as Arc<dyn TrackerStore>);
        let sessions = Arc::new(SessionManager::new(domain.clone(), store));
        let executor = ActionExecutor::new(Arc::new(self.registry)).with_timeout(self.action_timeout);

        let handle_message = HandleMessageHandler::new(
            sessions.clone(),
            self.interpreter,
            Arc::new(policy),
            Arc::new(executor),
            self.output,
        )
        .with_settings(self.settings);

        Ok(Agent {
            domain,
            get_tracker: GetTrackerHandler::new(sessions.clone()),
            sessions,
            handle_message,
            sweeper_config: self.sweeper_config,
        })
    }
}
