//! Storage Adapters
//!
//! Implementations of the TrackerStore port for persisting event logs.
//!
//! ## Available Adapters
//!
//! - **FileTrackerStore** - Stores each log as a YAML file on disk
//! - **InMemoryTrackerStore** - Stores logs in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use colloquy::adapters::storage::{FileTrackerStore, InMemoryTrackerStore};
//!
//! // Production: file-based storage
//! let store = FileTrackerStore::new("./data/trackers");
//!
//! // Testing: in-memory storage
//! let store = InMemoryTrackerStore::new();
//! ```

mod file_tracker_store;
mod in_memory_tracker_store;

pub use file_tracker_store::FileTrackerStore;
pub use in_memory_tracker_store::InMemoryTrackerStore;
