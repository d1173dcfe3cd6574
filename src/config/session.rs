//! Session lifecycle configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::BusyPolicy;

/// Live session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Behavior when a sender's previous turn is still running
    #[serde(default)]
    pub busy_policy: BusyPolicy,

    /// Inactivity after which a session is evicted from memory, in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// How often idle sessions are swept, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_timeout_secs == 0 || self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidSessionTiming);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            busy_policy: BusyPolicy::default(),
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.busy_policy, BusyPolicy::Wait);
        assert_eq!(config.idle_timeout(), Duration::from_secs(1800));
        assert!(config.validate().is_ok());
    }
}
