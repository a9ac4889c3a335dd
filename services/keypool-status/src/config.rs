//! Configuration types and loading
//!
//! Every section is optional and a missing file means all defaults.
//! Credentials are never read from the TOML; `[credentials]` only names the
//! environment variables that hold them.

use std::path::{Path, PathBuf};

use dispatch::DispatchSettings;
use keypool::{BackoffConfig, CredentialSource};
use serde::Deserialize;
use tracing::info;

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialSource,
    pub backoff: BackoffConfig,
    pub dispatch: DispatchSettings,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> common::Result<Self> {
        let config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Config::default()
        };

        if config.credentials.env_prefix.trim().is_empty() {
            return Err(common::Error::Config(
                "credentials.env_prefix must not be empty".into(),
            ));
        }

        config
            .backoff
            .validate()
            .map_err(|e| common::Error::Config(e.to_string()))?;

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("keypool.toml")
    }
}
