//! Collecting Output Channel
//!
//! Records every delivered message in memory. Useful for tests and for
//! callers that want to batch replies themselves.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, SenderId};
use crate::ports::{BotMessage, OutputChannel};

#[derive(Debug, Clone, Default)]
pub struct CollectingOutputChannel {
    messages: Arc<RwLock<Vec<BotMessage>>>,
}

impl CollectingOutputChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message delivered so far, in delivery order.
    pub async fn messages(&self) -> Vec<BotMessage> {
        self.messages.read().await.clone()
    }

    /// Texts delivered to one recipient, in delivery order.
    pub async fn texts_for(&self, recipient: &SenderId) -> Vec<String> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| &m.recipient == recipient)
            .map(|m| m.text.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.messages.write().await.clear();
    }
}

#[async_trait]
impl OutputChannel for CollectingOutputChannel {
    async fn send(&self, message: &BotMessage) -> Result<(), DomainError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collecting"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_messages_in_order_per_recipient() {
        let channel = CollectingOutputChannel::new();
        let alice = SenderId::new("alice").unwrap();
        let bob = SenderId::new("bob").unwrap();

        channel.send(&BotMessage::new(alice.clone(), "one")).await.unwrap();
        channel.send(&BotMessage::new(bob.clone(), "other")).await.unwrap();
        channel.send(&BotMessage::new(alice.clone(), "two")).await.unwrap();

        assert_eq!(channel.texts_for(&alice).await, vec!["one", "two"]);
        assert_eq!(channel.messages().await.len(), 3);

        channel.clear().await;
        assert!(channel.messages().await.is_empty());
    }
}
