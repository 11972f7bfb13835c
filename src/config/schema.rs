//! Configuration data structures for the commit graph.
//!
//! Defines the YAML config format: view defaults and the tuning knobs of the
//! Linear Bek and collapse layers. Every key is optional.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::SortType;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Sort used when a caller does not pick one.
    #[serde(default)]
    pub default_sort: SortType,

    #[serde(default)]
    pub linear_bek: LinearBekConfig,

    #[serde(default)]
    pub collapse: CollapseConfig,
}

impl GraphConfig {
    /// Parse YAML text; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}

// ---------------------------------------------------------------------------
// LinearBekConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearBekConfig {
    /// Longest merge side (in commits) that is still straightened.
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,
}

impl Default for LinearBekConfig {
    fn default() -> Self {
        Self {
            max_block_size: default_max_block_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// CollapseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapseConfig {
    /// Shortest run of plain commits that collapses into a dotted edge.
    #[serde(default = "default_min_run_length")]
    pub min_run_length: usize,
}

impl Default for CollapseConfig {
    fn default() -> Self {
        Self {
            min_run_length: default_min_run_length(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_max_block_size() -> usize {
    200
}

fn default_min_run_length() -> usize {
    1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
