//! Runtime Configuration
//!
//! Knobs for a [`Runtime`](crate::reactive::Runtime). Configs are plain serde
//! structs so hosts can ship them as JSON next to their other settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for one reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Drop a watcher from dependencies it no longer read on its latest run.
    ///
    /// With `false` a watcher stays subscribed to everything it ever read,
    /// which can cause extra (harmless) re-runs.
    pub prune_stale_dependencies: bool,

    /// Upper bound on microtasks executed by a single checkpoint.
    pub max_microtask_turns: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prune_stale_dependencies: true,
            max_microtask_turns: 10_000,
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_microtask_turns == 0 {
            return Err(ConfigError::Invalid(
                "max_microtask_turns must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
