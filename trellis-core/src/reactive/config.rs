//! Engine configuration.
//!
//! The engine has exactly two knobs. Both have defaults, so an empty JSON
//! object is a valid configuration.

use serde::{Deserialize, Serialize};

use super::error::EngineResult;

fn default_max_update_depth() -> usize {
    100
}

fn default_warn_detached() -> bool {
    true
}

/// Process-wide settings for the reactive engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many effect runs may nest inside one another before the engine
    /// refuses to go deeper. Guards against effects that write their own
    /// dependencies.
    #[serde(default = "default_max_update_depth")]
    pub max_update_depth: usize,

    /// Log a warning when an effect or cleanup is created outside any scope.
    #[serde(default = "default_warn_detached")]
    pub warn_detached: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_update_depth: default_max_update_depth(),
            warn_detached: default_warn_detached(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
