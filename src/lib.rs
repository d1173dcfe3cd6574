//! Colloquy - Conversational AI dialogue core
//!
//! This crate turns user utterances into bot actions: an interpreter
//! classifies each message, an event-sourced tracker records the
//! conversation, and a policy ensemble of hand-written rules and memorized
//! stories selects what the bot does next.
//!
//! - `domain` - Dialogue vocabulary, trackers, slots, and policies
//! - `ports` - Interfaces to interpreters, custom actions, storage, and channels
//! - `adapters` - Implementations of those interfaces
//! - `application` - Turn handling, action execution, and session lifecycle
//! - `config` - Environment-driven configuration and logging setup

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
