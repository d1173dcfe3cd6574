//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `COLLOQUY` prefix and nested values use double underscores as separators.
//! Every setting has a default, so an empty environment is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use colloquy::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Domain file: {}", config.paths.domain.display());
//! ```

mod actions;
mod error;
mod logging;
mod paths;
mod policy;
mod session;
mod tracker_store;

pub use actions::ActionsConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{init_tracing, LogFormat, LoggingConfig};
pub use paths::PathsConfig;
pub use policy::PolicyConfig;
pub use session::SessionConfig;
pub use tracker_store::{TrackerStoreBackend, TrackerStoreConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Action selection (memoization, thresholds, loop cap)
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Custom action execution
    #[serde(default)]
    pub actions: ActionsConfig,

    /// Live session lifecycle
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Event log persistence
    #[serde(default)]
    pub tracker_store: TrackerStoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Domain, training and NLU data files
    #[serde(default)]
    pub paths: PathsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `COLLOQUY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `COLLOQUY__POLICY__MAX_HISTORY=3` -> `policy.max_history = 3`
    /// - `COLLOQUY__TRACKER_STORE__BACKEND=file` -> `tracker_store.backend = file`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("COLLOQUY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.policy.validate()?;
        self.actions.validate()?;
        self.sessions.validate()?;
        self.tracker_store.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
