//! Order status custom action.
//!
//! Looks up the order named by the `order_id` slot and records the result in
//! the `order_status` slot. Used by the sample bot and the shell binary.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::dialogue::Event;
use crate::ports::{ActionContext, ActionError, CustomActionHandler};

pub const CHECK_ORDER_STATUS: &str = "action_check_order_status";

/// Source of order statuses.
#[async_trait]
pub trait OrderStatusLookup: Send + Sync {
    /// Status of an order, `None` if the order does not exist.
    async fn status(&self, order_id: &str) -> Result<Option<String>, ActionError>;
}

/// Fixed table of order statuses.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStatusLookup {
    orders: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryOrderStatusLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order_id: impl Into<String>, status: impl Into<String>) {
        self.orders.write().await.insert(order_id.into(), status.into());
    }
}

#[async_trait]
impl OrderStatusLookup for InMemoryOrderStatusLookup {
    async fn status(&self, order_id: &str) -> Result<Option<String>, ActionError> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }
}

pub struct CheckOrderStatus {
    lookup: Arc<dyn OrderStatusLookup>,
}

impl CheckOrderStatus {
    pub fn new(lookup: Arc<dyn OrderStatusLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl CustomActionHandler for CheckOrderStatus {
    async fn run(&self, ctx: ActionContext) -> Result<Vec<Event>, ActionError> {
        let Some(order_id) = ctx.slot_str("order_id") else {
            return Ok(vec![Event::bot_uttered("Which order number should I look up?")]);
        };

        match self.lookup.status(order_id).await? {
            Some(status) => Ok(vec![
                Event::slot_set("order_status", status.clone()),
                Event::bot_uttered(format!("Order {} is {}.", order_id, status)),
            ]),
            None => Ok(vec![
                Event::slot_set("order_status", serde_json::Value::Null),
                Event::bot_uttered(format!("I couldn't find order {}.", order_id)),
            ]),
        }
    }
}
