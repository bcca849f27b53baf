//! Parameter selection settings
//!
//! Chooses the network preset and whether checkpoints are enforced. Loaded
//! from JSON or from `DINGO_NETWORK` / `DINGO_CHECKPOINTS`.

use crate::checkpoints::CheckpointValidator;
use crate::network::NetworkType;
use crate::params::{self, ChainParams};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Environment variable selecting the network
pub const NETWORK_ENV: &str = "DINGO_NETWORK";
/// Environment variable toggling checkpoint enforcement
pub const CHECKPOINTS_ENV: &str = "DINGO_CHECKPOINTS";

/// Persistent parameter selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    /// Network preset
    pub network: NetworkType,
    /// Reject chains that conflict with the built-in checkpoints
    pub enforce_checkpoints: bool,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Mainnet,
            enforce_checkpoints: true,
        }
    }
}

impl ParamsConfig {
    /// Parse from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading parameter config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Read from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(network) = lookup(NETWORK_ENV) {
            config.network = network.parse()?;
        }
        if let Some(flag) = lookup(CHECKPOINTS_ENV) {
            config.enforce_checkpoints = parse_flag(&flag).ok_or_else(|| {
                Error::InvalidConfig(format!("{}={} is not a boolean", CHECKPOINTS_ENV, flag))
            })?;
        }
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Cached parameters of the selected network
    pub fn resolve(&self) -> Result<&'static ChainParams> {
        params::try_get(self.network)
    }

    /// Checkpoint validator honoring `enforce_checkpoints`
    pub fn checkpoint_validator<'a>(&self, params: &'a ChainParams) -> CheckpointValidator<'a> {
        if self.enforce_checkpoints {
            params.checkpoint_validator()
        } else {
            warn!("Checkpoint enforcement disabled for {}", params.network_type());
            CheckpointValidator::disabled()
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
