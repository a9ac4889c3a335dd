//! Backoff between credential switches
//!
//! `delay(attempt)` is `base * 2^attempt` plus uniform jitter in
//! `[0, max_jitter]`, capped at `max_delay`. The dispatcher only waits between
//! a failed attempt and the next attempt on a different slot; never before the
//! first attempt and never after the last one of a cycle.

use std::time::Duration;

use rand::RngExt;
use serde::Deserialize;

use crate::error::{Error, Result};

/// `[backoff]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            max_jitter_ms: 1000,
        }
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::Configuration(format!(
                "max_delay_ms ({}) must be >= base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }
}

/// Exponential backoff with bounded jitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffScheduler {
    base: Duration,
    max: Duration,
    max_jitter: Duration,
}

impl BackoffScheduler {
    pub fn new(base: Duration, max: Duration, max_jitter: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            max_jitter,
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            Duration::from_millis(config.max_jitter_ms),
        )
    }

    /// Zero delay between switches.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Deterministic part of the delay: `base * 2^attempt`, capped.
    pub fn exponential(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Full delay for the wait after failed attempt number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        (self.exponential(attempt) + self.jitter()).min(self.max)
    }

    pub fn max_delay(&self) -> Duration {
        self.max
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

impl Default for BackoffScheduler {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}
