//! Custom action configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Custom action execution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ActionsConfig {
    /// Bound on one custom action's run time, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ActionsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_ms == 0 || self.timeout_ms > 300_000 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_five_seconds() {
        assert_eq!(ActionsConfig::default().timeout(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = ActionsConfig { timeout_ms: 0 };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }
}
