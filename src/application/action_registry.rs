//! Registry of custom action handlers, keyed by action name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::dialogue::{Domain, DomainLoadError};
use crate::ports::CustomActionHandler;

#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: BTreeMap<String, Arc<dyn CustomActionHandler>>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. A later registration for the same name replaces
    /// the earlier one.
    pub fn register(&mut self, handler_id: impl Into<String>, handler: Arc<dyn CustomActionHandler>) -> &mut Self {
        self.handlers.insert(handler_id.into(), handler);
        self
    }

    pub fn get(&self, handler_id: &str) -> Option<Arc<dyn CustomActionHandler>> {
        self.handlers.get(handler_id).cloned()
    }

    pub fn contains(&self, handler_id: &str) -> bool {
        self.handlers.contains_key(handler_id)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Every registered handler must be declared as a custom action.
    pub fn validate(&self, domain: &Domain) -> Result<(), DomainLoadError> {
        match self.names().find(|name| !domain.has_custom_action(name)) {
            Some(name) => Err(DomainLoadError::unknown_action(name, "action registry")),
            None => Ok(()),
        }
    }

    /// Declared custom actions with no registered handler.
    pub fn missing_handlers<'a>(&self, domain: &'a Domain) -> Vec<&'a str> {
        domain.custom_actions().filter(|name| !self.contains(name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dialogue::Event;
    use crate::ports::{ActionContext, ActionError};
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl CustomActionHandler for Noop {
        async fn run(&self, _ctx: ActionContext) -> Result<Vec<Event>, ActionError> {
            Ok(vec![])
        }
    }

    fn domain() -> Domain {
        Domain::builder()
            .action("action_lookup")
            .action("action_other")
            .build()
            .unwrap()
    }

    #[test]
    fn registered_handlers_are_found() {
        let mut registry = ActionRegistry::new();
        registry.register("action_lookup", Arc::new(Noop));

        assert!(registry.get("action_lookup").is_some());
        assert!(registry.get("action_missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn undeclared_handler_fails_validation() {
        let mut registry = ActionRegistry::new();
        registry.register("action_undeclared", Arc::new(Noop));

        assert!(matches!(
            registry.validate(&domain()),
            Err(DomainLoadError::UnknownAction { action, .. }) if action == "action_undeclared"
        ));
    }

    #[test]
    fn reports_missing_handlers() {
        let mut registry = ActionRegistry::new();
        registry.register("action_lookup", Arc::new(Noop));
        let domain = domain();

        assert!(registry.validate(&domain).is_ok());
        assert_eq!(registry.missing_handlers(&domain), vec!["action_other"]);
    }
}
