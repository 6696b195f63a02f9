mod account;
mod connection;

pub use account::*;
pub use connection::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Environment variable naming the config file to load.
pub const CONFIG_PATH_ENV: &str = "AL_CONFIG";
/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "agentlink.toml";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Static service-name → domain table (e.g. `asyncMessagingEnt`).
    ///
    /// Consulted by the SDK's static domain resolver; keys keep the
    /// service's own casing.
    #[serde(default)]
    pub domains: BTreeMap<String, String>,
}

impl Config {
    /// Parse a config from a TOML string.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load the config from `path`, or fall back to defaults when the file
    /// does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Load the config from the path in `AL_CONFIG` (or `agentlink.toml`).
    /// Returns the parsed config and the path that was used.
    pub fn load_from_env() -> Result<(Self, String)> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let config = Self::load(&path)?;
        Ok((config, path))
    }
}
