//! Data file locations

use serde::Deserialize;
use std::path::PathBuf;

/// Where the domain, training data and NLU patterns are read from
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_domain")]
    pub domain: PathBuf,

    #[serde(default = "default_training")]
    pub training: PathBuf,

    #[serde(default = "default_nlu")]
    pub nlu: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            training: default_training(),
            nlu: default_nlu(),
        }
    }
}

fn default_domain() -> PathBuf {
    PathBuf::from("data/domain.yml")
}

fn default_training() -> PathBuf {
    PathBuf::from("data/rules.yml")
}

fn default_nlu() -> PathBuf {
    PathBuf::from("data/nlu.yml")
}
