//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the dialogue core to external systems:
//! - `nlu` - Interpreters (regex patterns, mock)
//! - `storage` - Tracker stores (in-memory, YAML files)
//! - `channels` - Output channels (collecting, console)
//! - `actions` - Custom action handlers

pub mod actions;
pub mod channels;
pub mod nlu;
pub mod storage;

pub use actions::{CheckOrderStatus, InMemoryOrderStatusLookup};
pub use channels::{CollectingOutputChannel, ConsoleOutputChannel};
pub use nlu::{MockInterpreter, RegexInterpreter};
pub use storage::{FileTrackerStore, InMemoryTrackerStore};
