//! Domain layer containing the dialogue model.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machine)
//! - `dialogue` - Events, slots, the domain declaration, and the tracker
//! - `policy` - Next-action selection (rules, memoization, ensemble)

pub mod dialogue;
pub mod foundation;
pub mod policy;
