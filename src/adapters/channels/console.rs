//! Console Output Channel
//!
//! Writes bot messages to stdout, used by the interactive shell.

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{BotMessage, OutputChannel};

pub struct ConsoleOutputChannel {
    prefix: String,
    stdout: Mutex<Stdout>,
}

impl ConsoleOutputChannel {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for ConsoleOutputChannel {
    fn default() -> Self {
        Self::new("bot> ")
    }
}

#[async_trait]
impl OutputChannel for ConsoleOutputChannel {
    async fn send(&self, message: &BotMessage) -> Result<(), DomainError> {
        let line = format!("{}{}\n", self.prefix, message.text);
        let mut stdout = self.stdout.lock().await;
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| DomainError::storage(format!("stdout: {}", e)))?;
        stdout
            .flush()
            .await
            .map_err(|e| DomainError::storage(format!("stdout: {}", e)))
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
