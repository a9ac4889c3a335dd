//! Shared dispatch state
//!
//! One explicitly owned object per logical remote service, handed (via `Arc`)
//! to every dispatcher and call contract that targets it. It holds the only
//! mutable shared state of the subsystem: the credential pool behind a mutex,
//! and the exhaustion breaker (atomic).
//!
//! The pool is reachable only through `with_pool`, whose closure cannot await,
//! so the lock is never held across remote I/O or a backoff sleep.

use std::sync::Mutex;

use crate::breaker::ExhaustionBreaker;
use crate::pool::CredentialPool;

#[derive(Debug)]
pub struct SharedDispatchState {
    pool: Mutex<CredentialPool>,
    breaker: ExhaustionBreaker,
}

impl SharedDispatchState {
    pub fn new(pool: CredentialPool) -> Self {
        Self {
            pool: Mutex::new(pool),
            breaker: ExhaustionBreaker::new(),
        }
    }

    pub fn breaker(&self) -> &ExhaustionBreaker {
        &self.breaker
    }

    /// Run `f` with the pool locked. Keep `f` short.
    pub fn with_pool<R>(&self, f: impl FnOnce(&mut CredentialPool) -> R) -> R {
        let mut pool = self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *pool)
    }

    pub fn reset_breaker(&self) -> bool {
        self.breaker.reset()
    }

    /// Pool and breaker summary. Secrets appear only as `Secret::hint`.
    ///
    /// Status mapping: breaker tripped → exhausted, every slot usable with no
    /// recorded failures → healthy, otherwise degraded.
    pub fn status(&self) -> serde_json::Value {
        let tripped_at_ms = self.breaker.tripped_at_millis();

        self.with_pool(|pool| {
            let current = pool.current_index();
            let slots: Vec<serde_json::Value> = pool
                .slots()
                .iter()
                .enumerate()
                .map(|(idx, slot)| {
                    serde_json::json!({
                        "id": slot.id(),
                        "key_hint": slot.secret().hint(),
                        "usable": slot.is_usable(),
                        "consecutive_failures": slot.consecutive_failures(),
                        "is_current": idx == current,
                    })
                })
                .collect();

            let all_clean = pool
                .slots()
                .iter()
                .all(|s| s.is_usable() && s.consecutive_failures() == 0);
            let status = if tripped_at_ms.is_some() {
                "exhausted"
            } else if all_clean {
                "healthy"
            } else {
                "degraded"
            };

            serde_json::json!({
                "status": status,
                "current_slot": pool.current().id(),
                "current_index": current,
                "slots_total": pool.len(),
                "slots_usable": pool.usable_len(),
                "breaker": {
                    "tripped": tripped_at_ms.is_some(),
                    "tripped_at_ms": tripped_at_ms,
                },
                "slots": slots,
            })
        })
    }
}
