//! Quota detection for remote endpoint failures
//!
//! Distinguishes "this credential's quota is exhausted" from every other
//! failure. Only quota exhaustion rotates to another credential; everything
//! else fails the dispatch without a retry.

use crate::ErrorClass;

/// Provider phrases that mean the credential's usage limit is exhausted.
const QUOTA_PATTERNS: &[&str] = &[
    "429",
    "resource_exhausted",
    "resource exhausted",
    "quota exceeded",
    "exceeded your current quota",
    "rate limit exceeded",
];

/// Classify a provider error message (SDK exception text, gRPC status, ...).
///
/// Case-insensitive substring match against `QUOTA_PATTERNS`. Anything that
/// does not look like quota exhaustion is `Transient`; callers that know a
/// failure is a content or credential problem should build `Fatal` directly.
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if QUOTA_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::QuotaExhausted
    } else {
        ErrorClass::Transient
    }
}

/// Classify an HTTP failure by status code and response body.
///
/// 429 is always quota. A body carrying a quota phrase is quota regardless of
/// status (some gateways wrap RESOURCE_EXHAUSTED in a 400 or 403). 408 and 5xx
/// are Transient. Remaining 4xx are Fatal: the request or the credential is
/// wrong and switching credentials will not fix it.
pub fn classify_status(status: u16, body: &str) -> ErrorClass {
    if status == 429 {
        return ErrorClass::QuotaExhausted;
    }
    if classify_message(body) == ErrorClass::QuotaExhausted {
        return ErrorClass::QuotaExhausted;
    }
    match status {
        408 | 500..=599 => ErrorClass::Transient,
        400..=499 => ErrorClass::Fatal,
        _ => ErrorClass::Transient,
    }
}
