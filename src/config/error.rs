//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("max_history must be at least 1")]
    InvalidMaxHistory,

    #[error("{0} must be between 0 and 1")]
    InvalidThreshold(&'static str),

    #[error("max_actions_per_turn must be at least 1")]
    InvalidActionCap,

    #[error("Invalid action timeout")]
    InvalidTimeout,

    #[error("Session sweep interval and idle timeout must be positive")]
    InvalidSessionTiming,
}
