//! Runtime configuration
//!
//! Handles loading `tusk.toml`. Every key is optional.
//!
//! ```toml
//! [hydration]
//! max_depth = 2
//!
//! [pagination]
//! default_limit = 100
//! max_limit = 500
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, TuskError};

pub const CONFIG_FILE: &str = "tusk.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub hydration: HydrationConfig,
    pub pagination: PaginationConfig,
}

/// Hydration limits; each pass copies these when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HydrationConfig {
    /// Levels of records emitted; 1 emits the top record's fields only.
    pub max_depth: usize,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self { max_depth: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    /// LIMIT used when a request carries no usable `page`/`size`
    pub default_limit: u64,
    /// Upper bound for a requested `size`
    pub max_limit: Option<u64>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 1000,
            max_limit: None,
        }
    }
}

impl Config {
    /// Load from `tusk.toml` in the working directory
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TuskError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
            .map_err(|e| TuskError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| TuskError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(max) = self.pagination.max_limit {
            if max == 0 || max < self.pagination.default_limit {
                return Err(TuskError::Config(format!(
                    "pagination.max_limit ({max}) must be at least default_limit ({})",
                    self.pagination.default_limit
                )));
            }
        }
        Ok(())
    }
}
