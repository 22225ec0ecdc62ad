//! Bridge configuration.
//!
//! Resolved once at startup: an optional JSON file named by
//! `UVM_DEBUG_CONFIG`, then individual `UVM_DEBUG_*` variables on top.

use crate::backend::BackendKind;
use crate::buffer::{DEFAULT_CAPACITY, MIN_CAPACITY};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_CONFIG: &str = "UVM_DEBUG_CONFIG";
pub const ENV_BACKEND: &str = "UVM_DEBUG_BACKEND";
pub const ENV_CAPACITY: &str = "UVM_DEBUG_BUFFER_CAPACITY";
pub const ENV_PROMPT: &str = "UVM_DEBUG_PROMPT";

pub const DEFAULT_PROMPT: &str = "uvm_debug> ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub backend: BackendKind,
    pub capacity: usize,
    pub prompt: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            capacity: DEFAULT_CAPACITY,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Invalid bridge config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bridge config {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BridgeConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG) {
            Some(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim()))?,
            _ => Self::default(),
        };

        if let Some(backend) = lookup(ENV_BACKEND) {
            config.backend = backend
                .parse()
                .with_context(|| format!("{} is invalid", ENV_BACKEND))?;
        }

        if let Some(capacity) = lookup(ENV_CAPACITY) {
            config.capacity = capacity
                .trim()
                .parse()
                .with_context(|| format!("{} must be a byte count", ENV_CAPACITY))?;
        }

        if let Some(prompt) = lookup(ENV_PROMPT) {
            config.prompt = prompt;
        }

        config.validate()?;
        tracing::debug!(backend = %config.backend, capacity = config.capacity, "bridge config resolved");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity < MIN_CAPACITY {
            anyhow::bail!(
                "buffer capacity {} is below the minimum of {} bytes",
                self.capacity,
                MIN_CAPACITY
            );
        }
        Ok(())
    }
}
