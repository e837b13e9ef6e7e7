//! Graph configuration.
//!
//! ```toml
//! verify_after_load = true
//! max_observer_rounds = 64
//! max_sync_batch = 1024
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Tunables for a [`BoxGraph`](crate::BoxGraph) and its sync layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Run `verify_pointers` after `from_bytes`.
    pub verify_after_load: bool,
    /// Upper bound on end-of-transaction observer rounds.
    pub max_observer_rounds: usize,
    /// Largest number of tasks sent in one sync batch.
    pub max_sync_batch: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            verify_after_load: true,
            max_observer_rounds: 64,
            max_sync_batch: 1024,
        }
    }
}

impl GraphConfig {
    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> GraphResult<Self> {
        let config: GraphConfig =
            toml::from_str(source).map_err(|e| GraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings under which the graph cannot operate.
    pub fn validate(&self) -> GraphResult<()> {
        if self.max_observer_rounds == 0 {
            return Err(GraphError::Config(
                "max_observer_rounds must be at least 1".to_string(),
            ));
        }
        if self.max_sync_batch == 0 {
            return Err(GraphError::Config(
                "max_sync_batch must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> GraphResult<String> {
        toml::to_string(self).map_err(|e| GraphError::Config(e.to_string()))
    }
}
