//! Dispatch events and metrics
//!
//! Every state transition of a dispatch is emitted as a `DispatchEvent`. Each
//! event updates Prometheus metrics and is then handed to the configured
//! `DispatchObserver`.
//!
//! - `keypool_dispatch_attempts_total` (counter): label `slot`
//! - `keypool_quota_signals_total` (counter): label `slot`
//! - `keypool_rotations_total` (counter): labels `from`, `to`
//! - `keypool_breaker_trips_total` (counter)
//! - `keypool_remote_failures_total` (counter): labels `slot`, `class`
//! - `keypool_fallbacks_total` (counter): label `reason`
//! - `keypool_invoke_duration_seconds` (histogram): label `source`
//!
//! No recorder is installed here. Without one the metric calls are no-ops.

use std::sync::Mutex;
use std::time::Duration;

use remote::ErrorClass;

use crate::result::Provenance;

/// Histogram buckets for `keypool_invoke_duration_seconds`, 5ms to 120s.
pub const INVOKE_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
];

/// Why a call was served by the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Breaker was already tripped; the remote was not contacted.
    BreakerOpen,
    /// This call exhausted the ring (and tripped the breaker).
    Exhausted,
    Quota,
    Transient,
    Fatal,
}

impl FallbackReason {
    pub fn label(&self) -> &'static str {
        match self {
            FallbackReason::BreakerOpen => "breaker_open",
            FallbackReason::Exhausted => "exhausted",
            FallbackReason::Quota => "quota",
            FallbackReason::Transient => "transient",
            FallbackReason::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    Attempt {
        slot_id: String,
        attempt: u32,
    },
    Succeeded {
        slot_id: String,
        attempt: u32,
    },
    QuotaSignal {
        slot_id: String,
        consecutive_failures: u32,
    },
    /// The shared pointer moved and the caller is about to wait `delay`.
    Rotated {
        from: String,
        to: String,
        delay: Duration,
    },
    /// Emitted only by the call that actually tripped the breaker.
    BreakerTripped {
        tried: usize,
    },
    RemoteFailed {
        slot_id: String,
        class: ErrorClass,
        cause: String,
    },
    Fallback {
        reason: FallbackReason,
    },
}

/// Hook for collaborators that want to see dispatch transitions.
pub trait DispatchObserver: Send + Sync {
    fn on_event(&self, event: &DispatchEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {
    fn on_event(&self, _event: &DispatchEvent) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        self.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&DispatchEvent) -> bool) -> usize {
        self.lock().iter().filter(|e| matches(e)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DispatchEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DispatchObserver for RecordingObserver {
    fn on_event(&self, event: &DispatchEvent) {
        self.lock().push(event.clone());
    }
}

/// Record metrics for `event`, then notify `observer`.
pub(crate) fn emit(observer: &dyn DispatchObserver, event: DispatchEvent) {
    record_event(&event);
    observer.on_event(&event);
}

fn record_event(event: &DispatchEvent) {
    match event {
        DispatchEvent::Attempt { slot_id, .. } => {
            metrics::counter!("keypool_dispatch_attempts_total", "slot" => slot_id.clone())
                .increment(1);
        }
        DispatchEvent::Succeeded { .. } => {}
        DispatchEvent::QuotaSignal { slot_id, .. } => {
            metrics::counter!("keypool_quota_signals_total", "slot" => slot_id.clone())
                .increment(1);
        }
        DispatchEvent::Rotated { from, to, .. } => {
            metrics::counter!("keypool_rotations_total", "from" => from.clone(), "to" => to.clone())
                .increment(1);
        }
        DispatchEvent::BreakerTripped { .. } => {
            metrics::counter!("keypool_breaker_trips_total").increment(1);
        }
        DispatchEvent::RemoteFailed { slot_id, class, .. } => {
            metrics::counter!(
                "keypool_remote_failures_total",
                "slot" => slot_id.clone(),
                "class" => class.label()
            )
            .increment(1);
        }
        DispatchEvent::Fallback { reason } => {
            metrics::counter!("keypool_fallbacks_total", "reason" => reason.label()).increment(1);
        }
    }
}

/// Record the end-to-end duration of one `CallContract::invoke`.
pub(crate) fn record_invoke_duration(source: Provenance, duration_secs: f64) {
    metrics::histogram!("keypool_invoke_duration_seconds", "source" => source.as_str())
        .record(duration_secs);
}
