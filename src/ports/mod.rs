//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the dialogue core and the outside world. Adapters implement these ports.
//!
//! ## Inbound
//!
//! - `Interpreter` - Text to intent and entities
//!
//! ## Side effects
//!
//! - `CustomActionHandler` - Developer-defined actions
//!
//! ## Outbound
//!
//! - `TrackerStore` - Event log persistence
//! - `OutputChannel` - Bot message delivery

mod custom_action;
mod interpreter;
mod output_channel;
mod tracker_store;

pub use custom_action::{ActionContext, ActionError, CustomActionHandler};
pub use interpreter::{Interpreter, InterpreterError};
pub use output_channel::{BotMessage, OutputChannel};
pub use tracker_store::TrackerStore;
