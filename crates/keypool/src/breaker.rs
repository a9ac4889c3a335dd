//! Process-wide exhaustion latch
//!
//! Trips once a dispatch cycle has tried every usable slot without success.
//! While tripped, callers skip the remote endpoint entirely and go straight to
//! their fallback. There is no automatic reset: only `reset()` clears it.
//!
//! The latch is a single `AtomicU64` holding the trip time in unix millis
//! (0 = not tripped), so `is_tripped` is a lock-free read and `trip` is a
//! compare-and-swap that only the first caller wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

/// Snapshot of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExhaustionState {
    pub tripped: bool,
    pub tripped_at: Option<SystemTime>,
}

#[derive(Debug, Default)]
pub struct ExhaustionBreaker {
    tripped_at_ms: AtomicU64,
}

impl ExhaustionBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped_at_ms.load(Ordering::Acquire) != 0
    }

    /// Trip the breaker. Idempotent: returns true only for the call that
    /// actually tripped it; later calls leave the original trip time intact.
    pub fn trip(&self) -> bool {
        let now = now_millis().max(1);
        let won = self
            .tripped_at_ms
            .compare_exchange(0, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            warn!("all credential slots exhausted, breaker tripped");
        }
        won
    }

    /// Administrative reset. Returns true if the breaker was tripped.
    pub fn reset(&self) -> bool {
        let was = self.tripped_at_ms.swap(0, Ordering::AcqRel) != 0;
        if was {
            info!("exhaustion breaker reset");
        }
        was
    }

    pub fn state(&self) -> ExhaustionState {
        match self.tripped_at_ms.load(Ordering::Acquire) {
            0 => ExhaustionState {
                tripped: false,
                tripped_at: None,
            },
            ms => ExhaustionState {
                tripped: true,
                tripped_at: Some(UNIX_EPOCH + Duration::from_millis(ms)),
            },
        }
    }

    pub(crate) fn tripped_at_millis(&self) -> Option<u64> {
        match self.tripped_at_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(ms),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
