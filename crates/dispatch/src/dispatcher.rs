//! Credential-rotating dispatch
//!
//! One `dispatch` call is one cycle over the credential ring:
//!
//! 1. Pick the slot `RotationPolicy` chooses (normally the pool's current one)
//! 2. Call the remote with that slot's secret, outside the pool lock
//! 3. Success → reset the slot's failure count and return
//! 4. Quota → count the failure, move the shared pointer to the next untried
//!    usable slot, wait the backoff delay, go to 1
//! 5. Transient or fatal → count the failure and return the error; no rotation
//! 6. No untried usable slot left → trip the breaker, return `AllSlotsExhausted`
//!
//! Each slot is attempted at most once per cycle, so a cycle makes at most
//! `pool.len()` remote calls.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use keypool::{BackoffScheduler, RotationDecision, RotationPolicy, SharedDispatchState, TriedSlots};
use remote::{CallCredential, DispatchOutcome, ErrorClass, RemoteCall, RemoteError, RemoteReply};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::events::{self, DispatchEvent, DispatchObserver, NoopObserver};

/// `[dispatch]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Upper bound for a single remote attempt. 0 disables the bound.
    pub attempt_timeout_ms: u64,
    /// Treat an attempt timeout as a quota signal (rotate) instead of a
    /// transient failure.
    pub timeout_is_quota: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 60_000,
            timeout_is_quota: false,
        }
    }
}

impl DispatchSettings {
    pub fn attempt_timeout(&self) -> Option<Duration> {
        (self.attempt_timeout_ms > 0).then(|| Duration::from_millis(self.attempt_timeout_ms))
    }
}

/// A remote reply and the slot that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched<T> {
    pub reply: RemoteReply<T>,
    pub slot_id: String,
}

pub struct ResilientDispatcher<Req, Resp> {
    state: Arc<SharedDispatchState>,
    remote: Arc<dyn RemoteCall<Req, Resp>>,
    policy: RotationPolicy,
    backoff: BackoffScheduler,
    settings: DispatchSettings,
    observer: Arc<dyn DispatchObserver>,
}

impl<Req, Resp> ResilientDispatcher<Req, Resp>
where
    Req: Sync,
    Resp: Send,
{
    pub fn new(state: Arc<SharedDispatchState>, remote: Arc<dyn RemoteCall<Req, Resp>>) -> Self {
        Self {
            state,
            remote,
            policy: RotationPolicy,
            backoff: BackoffScheduler::default(),
            settings: DispatchSettings::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffScheduler) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &Arc<SharedDispatchState> {
        &self.state
    }

    pub fn remote_id(&self) -> &str {
        self.remote.id()
    }

    /// Run one dispatch cycle for `request`.
    ///
    /// Returns `AllSlotsExhausted { tried: 0 }` without calling the remote
    /// when the breaker is already tripped.
    pub async fn dispatch(&self, request: &Req) -> Result<Dispatched<Resp>> {
        let breaker = self.state.breaker();
        let max_attempts = self.state.with_pool(|pool| pool.len());
        let mut tried = TriedSlots::new();
        let mut last_error = None;

        for attempt in 0..max_attempts as u32 {
            // Another caller may have tripped the breaker while we waited.
            if breaker.is_tripped() {
                debug!(attempt, "breaker tripped, abandoning dispatch");
                return Err(Error::AllSlotsExhausted { tried: tried.len() });
            }

            let picked = self.state.with_pool(|pool| {
                let index = match self.policy.decide(pool, &tried) {
                    RotationDecision::Retry(index) | RotationDecision::RotateTo(index) => index,
                    RotationDecision::Exhausted => return None,
                };
                let slot = pool.advance_to(index).ok()?;
                Some((index, slot.id().to_string(), slot.secret().clone()))
            });
            let Some((index, slot_id, secret)) = picked else {
                return Err(self.exhaust(tried.len()));
            };
            tried.insert(index);

            debug!(slot_id = %slot_id, attempt, remote = self.remote.id(), "dispatching");
            self.emit(DispatchEvent::Attempt {
                slot_id: slot_id.clone(),
                attempt,
            });

            match self.attempt(&slot_id, &secret, request).await {
                DispatchOutcome::Success(reply) => {
                    self.state.with_pool(|pool| {
                        if let Err(e) = pool.record_success(&slot_id) {
                            warn!(error = %e, "failed to record success");
                        }
                    });
                    self.emit(DispatchEvent::Succeeded {
                        slot_id: slot_id.clone(),
                        attempt,
                    });
                    return Ok(Dispatched { reply, slot_id });
                }
                DispatchOutcome::QuotaExhausted(cause) => {
                    let (failures, next) = self.state.with_pool(|pool| {
                        let failures = pool.record_failure(&slot_id).unwrap_or_default();
                        let next = match self.policy.decide(pool, &tried) {
                            RotationDecision::Retry(index) => pool.slot(index),
                            RotationDecision::RotateTo(index) => pool.advance_to(index).ok(),
                            RotationDecision::Exhausted => None,
                        };
                        (failures, next.map(|slot| slot.id().to_string()))
                    });

                    warn!(
                        slot_id = %slot_id,
                        consecutive_failures = failures,
                        cause = %cause,
                        "credential quota exhausted"
                    );
                    self.emit(DispatchEvent::QuotaSignal {
                        slot_id: slot_id.clone(),
                        consecutive_failures: failures,
                    });

                    let Some(next_id) = next else {
                        return Err(self.exhaust(tried.len()));
                    };

                    let delay = self.backoff.delay(attempt);
                    info!(
                        from = %slot_id,
                        to = %next_id,
                        delay_ms = delay.as_millis() as u64,
                        "rotating credential"
                    );
                    self.emit(DispatchEvent::Rotated {
                        from: slot_id.clone(),
                        to: next_id,
                        delay,
                    });
                    last_error = Some(Error::Quota { slot_id, cause });

                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                DispatchOutcome::TransientError(cause) => {
                    self.fail(&slot_id, ErrorClass::Transient, &cause);
                    return Err(Error::Transient { slot_id, cause });
                }
                DispatchOutcome::FatalError(cause) => {
                    self.fail(&slot_id, ErrorClass::Fatal, &cause);
                    return Err(Error::Fatal { slot_id, cause });
                }
            }
        }

        Err(last_error.unwrap_or(Error::AllSlotsExhausted { tried: tried.len() }))
    }

    /// One remote call, bounded by the attempt timeout.
    async fn attempt(
        &self,
        slot_id: &str,
        secret: &Secret<String>,
        request: &Req,
    ) -> DispatchOutcome<Resp> {
        let call = self.remote.call(CallCredential { slot_id, secret }, request);
        let result = match self.settings.attempt_timeout() {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    let class = if self.settings.timeout_is_quota {
                        ErrorClass::QuotaExhausted
                    } else {
                        ErrorClass::Transient
                    };
                    Err(RemoteError::new(
                        class,
                        format!("attempt timed out after {}ms", limit.as_millis()),
                    ))
                }
            },
            None => call.await,
        };
        result.into()
    }

    fn fail(&self, slot_id: &str, class: ErrorClass, cause: &str) {
        let failures = self
            .state
            .with_pool(|pool| pool.record_failure(slot_id).unwrap_or_default());
        error!(
            slot_id = %slot_id,
            class = class.label(),
            consecutive_failures = failures,
            cause = %cause,
            "remote call failed"
        );
        self.emit(DispatchEvent::RemoteFailed {
            slot_id: slot_id.to_string(),
            class,
            cause: cause.to_string(),
        });
    }

    /// Trip the breaker for a cycle that ran out of slots.
    fn exhaust(&self, tried: usize) -> Error {
        if self.state.breaker().trip() {
            self.emit(DispatchEvent::BreakerTripped { tried });
        }
        Error::AllSlotsExhausted { tried }
    }

    pub(crate) fn emit(&self, event: DispatchEvent) {
        events::emit(self.observer.as_ref(), event);
    }
}
