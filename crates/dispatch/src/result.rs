//! The uniform result every pipeline stage receives

use serde::Serialize;

/// Where a `CallResult` value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Remote,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Remote => "remote",
            Provenance::Fallback => "fallback",
        }
    }
}

/// Value plus provenance, confidence and latency.
///
/// `source` and `confidence` are always set; `confidence` is always within
/// `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResult<T> {
    value: T,
    source: Provenance,
    confidence: f64,
    latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    slot_id: Option<String>,
}

impl<T> CallResult<T> {
    /// Remote-sourced result. Missing or non-finite confidence means 1.0.
    pub(crate) fn remote(
        value: T,
        confidence: Option<f64>,
        slot_id: String,
        latency_ms: u64,
    ) -> Self {
        Self {
            value,
            source: Provenance::Remote,
            confidence: normalize_confidence(confidence, 1.0),
            latency_ms,
            slot_id: Some(slot_id),
        }
    }

    /// Fallback-sourced result. Non-finite confidence means 0.0.
    pub(crate) fn fallback(value: T, confidence: f64, latency_ms: u64) -> Self {
        Self {
            value,
            source: Provenance::Fallback,
            confidence: normalize_confidence(Some(confidence), 0.0),
            latency_ms,
            slot_id: None,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn source(&self) -> Provenance {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == Provenance::Fallback
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    /// Credential slot that served a remote result. None for fallbacks.
    pub fn slot_id(&self) -> Option<&str> {
        self.slot_id.as_deref()
    }
}

fn normalize_confidence(confidence: Option<f64>, default: f64) -> f64 {
    match confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => default,
    }
}
