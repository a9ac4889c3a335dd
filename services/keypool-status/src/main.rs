//! Credential pool status
//!
//! Operator CLI that:
//! 1. Loads `keypool.toml` (or `--config <path>` / `CONFIG_PATH`)
//! 2. Discovers credentials from the environment
//! 3. Builds the shared dispatch state exactly as a pipeline would
//! 4. Prints the pool and breaker status plus the effective settings as JSON
//!
//! Exits non-zero when no credential is usable.

mod config;

use std::path::Path;

use anyhow::{Context, Result};
use keypool::{CredentialPool, SharedDispatchState, SlotConfig, slots_from_env};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays a single JSON document
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str);

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let slots = slots_from_env(&config.credentials);
    let report = build_report(&config, &config_path, slots)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Build the shared state from `slots` and render it with the settings in use.
fn build_report(config: &Config, path: &Path, slots: Vec<SlotConfig>) -> Result<serde_json::Value> {
    let pool = CredentialPool::load(slots).with_context(|| {
        format!(
            "no usable credential in {} or {}_1..{}_{}",
            config.credentials.env_prefix,
            config.credentials.env_prefix,
            config.credentials.env_prefix,
            config.credentials.max_backups
        )
    })?;
    let state = SharedDispatchState::new(pool);

    Ok(serde_json::json!({
        "config": {
            "path": path.display().to_string(),
            "env_prefix": config.credentials.env_prefix,
            "max_backups": config.credentials.max_backups,
            "backoff": {
                "base_delay_ms": config.backoff.base_delay_ms,
                "max_delay_ms": config.backoff.max_delay_ms,
                "max_jitter_ms": config.backoff.max_jitter_ms,
            },
            "dispatch": {
                "attempt_timeout_ms": config.dispatch.attempt_timeout_ms,
                "timeout_is_quota": config.dispatch.timeout_is_quota,
            },
        },
        "pool": state.status(),
    }))
}
