//! Output Channel Port - Interface for delivering bot messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, SenderId};

/// An outbound message, in the order the bot produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotMessage {
    pub recipient: SenderId,
    pub text: String,
}

impl BotMessage {
    pub fn new(recipient: SenderId, text: impl Into<String>) -> Self {
        Self {
            recipient,
            text: text.into(),
        }
    }
}

/// Port for outbound delivery.
#[async_trait]
pub trait OutputChannel: Send + Sync {
    /// Deliver one message.
    async fn send(&self, message: &BotMessage) -> Result<(), DomainError>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}
