//! Interactive shell: chat with the bot defined under `data/` on stdin.
//!
//! Every line is one user message. `/stop` ends the session.

use std::error::Error;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use colloquy::adapters::{
    CheckOrderStatus, ConsoleOutputChannel, FileTrackerStore, InMemoryOrderStatusLookup, InMemoryTrackerStore,
    RegexInterpreter,
};
use colloquy::adapters::actions::CHECK_ORDER_STATUS;
use colloquy::application::{Agent, InboundMessage};
use colloquy::config::{init_tracing, AppConfig, TrackerStoreBackend};
use colloquy::domain::dialogue::{Domain, TrainingData};
use colloquy::domain::foundation::SenderId;
use colloquy::ports::TrackerStore;

const SHELL_SENDER: &str = "shell";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging);

    let domain = Domain::load(&config.paths.domain)?;
    let training = TrainingData::load(&config.paths.training)?;
    let interpreter = RegexInterpreter::load(&config.paths.nlu)?;
    interpreter.validate(&domain)?;

    let store: Arc<dyn TrackerStore> = match (config.tracker_store.backend, &config.tracker_store.path) {
        (TrackerStoreBackend::File, Some(path)) => Arc::new(FileTrackerStore::new(path)),
        _ => Arc::new(InMemoryTrackerStore::new()),
    };

    let orders = InMemoryOrderStatusLookup::new();
    orders.insert("1234", "shipped").await;
    orders.insert("5678", "pending").await;

    let agent = Agent::builder(domain, Arc::new(interpreter), Arc::new(ConsoleOutputChannel::default()))
        .with_config(&config)
        .store(store)
        .training(training)
        .action(CHECK_ORDER_STATUS, Arc::new(CheckOrderStatus::new(Arc::new(orders))))
        .build()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = agent.sweeper();
    let sweeper_task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    let sender = SenderId::new(SHELL_SENDER)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tracing::info!("Bot loaded. Type a message, or /stop to quit.");

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "/stop" {
            break;
        }

        match agent.handle_message(InboundMessage::new(sender.clone(), text)).await {
            Ok(report) => {
                for issue in &report.issues {
                    tracing::debug!(%issue, "Turn issue");
                }
            }
            Err(e) => tracing::error!(error = %e, "Turn failed"),
        }
    }

    shutdown_tx.send(true)?;
    sweeper_task.await??;
    Ok(())
}
