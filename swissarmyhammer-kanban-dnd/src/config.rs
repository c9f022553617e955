//! Tuning for order key allocation.
//!
//! Loaded from YAML:
//!
//! ```yaml
//! default_key: 1000000
//! key_step: 1000
//! rebalance_spacing: 1000
//! ```
//!
//! Missing fields fall back to [`OrderingConfig::default`].

use crate::error::{DndError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Key assigned to the first item of an empty container
pub const DEFAULT_KEY: i64 = 1_000_000;

/// Distance between a new edge key and its only neighbor
pub const DEFAULT_KEY_STEP: i64 = 1_000;

/// Distance between consecutive keys after a rebalance
pub const DEFAULT_REBALANCE_SPACING: i64 = 1_000;

/// Allocation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    pub default_key: i64,
    pub key_step: i64,
    pub rebalance_spacing: i64,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            default_key: DEFAULT_KEY,
            key_step: DEFAULT_KEY_STEP,
            rebalance_spacing: DEFAULT_REBALANCE_SPACING,
        }
    }
}

impl OrderingConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DndError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded ordering config");
        Ok(config)
    }

    pub fn with_default_key(mut self, default_key: i64) -> Self {
        self.default_key = default_key;
        self
    }

    pub fn with_key_step(mut self, key_step: i64) -> Self {
        self.key_step = key_step;
        self
    }

    pub fn with_rebalance_spacing(mut self, rebalance_spacing: i64) -> Self {
        self.rebalance_spacing = rebalance_spacing;
        self
    }

    /// Reject settings that would make allocation degenerate
    pub fn validate(&self) -> Result<()> {
        if self.key_step <= 0 {
            return Err(DndError::invalid_config(
                "key_step",
                format!("must be positive, got {}", self.key_step),
            ));
        }
        // A single key must fit between two rebalanced neighbors.
        if self.rebalance_spacing < 2 {
            return Err(DndError::invalid_config(
                "rebalance_spacing",
                format!("must be at least 2, got {}", self.rebalance_spacing),
            ));
        }
        Ok(())
    }
}
