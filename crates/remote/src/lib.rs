//! Transport seam for the quota-limited remote endpoint
//!
//! Defines the `RemoteCall` trait that decouples dispatch logic from the
//! network transport. Implementations perform one attempt with one credential
//! and surface failures as a `RemoteError` carrying an `ErrorClass`. The
//! class is the only input credential rotation depends on:
//! - `QuotaExhausted` rotates to the next credential slot
//! - `Transient` and `Fatal` fail the dispatch immediately

pub mod classify;

pub use classify::{classify_message, classify_status};

use common::Secret;
use std::future::Future;
use std::pin::Pin;

/// Classification of a failed remote attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// This credential's rate/usage limit is exceeded (429, RESOURCE_EXHAUSTED)
    QuotaExhausted,
    /// Timeouts, 5xx, connection resets
    Transient,
    /// Malformed requests, rejected credentials, undecodable replies
    Fatal,
}

impl ErrorClass {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClass::QuotaExhausted => "quota",
            ErrorClass::Transient => "transient",
            ErrorClass::Fatal => "fatal",
        }
    }
}

/// A failed remote attempt, already classified by the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} remote error: {message}", .class.label())]
pub struct RemoteError {
    pub class: ErrorClass,
    pub message: String,
}

impl RemoteError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::QuotaExhausted, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Fatal, message)
    }

    /// Build an error from an HTTP status and body using `classify_status`.
    pub fn from_status(status: u16, body: &str) -> Self {
        Self::new(
            classify_status(status, body),
            format!("status {status}: {}", truncate(body, 200)),
        )
    }

    /// Build an error from a provider message using `classify_message`.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(classify_message(&message), message)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Successful remote reply with an optional provider-reported confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteReply<T> {
    pub value: T,
    pub confidence: Option<f64>,
}

impl<T> RemoteReply<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Outcome of one remote attempt. Transient, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome<T> {
    Success(RemoteReply<T>),
    QuotaExhausted(String),
    TransientError(String),
    FatalError(String),
}

impl<T> From<std::result::Result<RemoteReply<T>, RemoteError>> for DispatchOutcome<T> {
    fn from(result: std::result::Result<RemoteReply<T>, RemoteError>) -> Self {
        match result {
            Ok(reply) => DispatchOutcome::Success(reply),
            Err(RemoteError { class, message }) => match class {
                ErrorClass::QuotaExhausted => DispatchOutcome::QuotaExhausted(message),
                ErrorClass::Transient => DispatchOutcome::TransientError(message),
                ErrorClass::Fatal => DispatchOutcome::FatalError(message),
            },
        }
    }
}

/// The credential handed to a transport for a single attempt.
#[derive(Debug, Clone, Copy)]
pub struct CallCredential<'a> {
    pub slot_id: &'a str,
    pub secret: &'a Secret<String>,
}

/// Boxed future returned by `RemoteCall::call`.
pub type CallFuture<'a, Resp> =
    Pin<Box<dyn Future<Output = std::result::Result<RemoteReply<Resp>, RemoteError>> + Send + 'a>>;

/// One attempt against the remote endpoint with one credential.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn RemoteCall<Req, Resp>>`).
pub trait RemoteCall<Req, Resp>: Send + Sync {
    /// Identifier for logging (e.g. "gemini")
    fn id(&self) -> &str;

    fn call<'a>(&'a self, credential: CallCredential<'a>, request: &'a Req) -> CallFuture<'a, Resp>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoRemote;

    impl RemoteCall<String, String> for EchoRemote {
        fn id(&self) -> &str {
            "echo"
        }

        fn call<'a>(
            &'a self,
            credential: CallCredential<'a>,
            request: &'a String,
        ) -> CallFuture<'a, String> {
            Box::pin(async move {
                if credential.secret.expose().is_empty() {
                    return Err(RemoteError::fatal("empty key"));
                }
                Ok(RemoteReply::new(format!("{}:{request}", credential.slot_id)))
            })
        }
    }

    #[tokio::test]
    async fn remote_call_is_object_safe() {
        let remote: std::sync::Arc<dyn RemoteCall<String, String>> = std::sync::Arc::new(EchoRemote);
        let secret = Secret::new("k".to_string());
        let reply = remote
            .call(
                CallCredential {
                    slot_id: "PRIMARY",
                    secret: &secret,
                },
                &"hi".to_string(),
            )
            .await
            .unwrap();
        assert_eq!(reply.value, "PRIMARY:hi");
        assert_eq!(reply.confidence, None);
        assert_eq!(remote.id(), "echo");
    }

    #[test]
    fn outcome_from_result_maps_each_class() {
        let ok: DispatchOutcome<u8> = Ok(RemoteReply::new(1).with_confidence(0.5)).into();
        assert!(matches!(ok, DispatchOutcome::Success(r) if r.confidence == Some(0.5)));

        let quota: DispatchOutcome<u8> = Err(RemoteError::quota("429")).into();
        assert_eq!(quota, DispatchOutcome::QuotaExhausted("429".into()));

        let transient: DispatchOutcome<u8> = Err(RemoteError::transient("timeout")).into();
        assert_eq!(transient, DispatchOutcome::TransientError("timeout".into()));

        let fatal: DispatchOutcome<u8> = Err(RemoteError::fatal("bad request")).into();
        assert_eq!(fatal, DispatchOutcome::FatalError("bad request".into()));
    }

    #[test]
    fn from_status_classifies_and_truncates_body() {
        let long_body = "x".repeat(500);
        let err = RemoteError::from_status(503, &long_body);
        assert_eq!(err.class, ErrorClass::Transient);
        assert!(err.message.len() < 220, "message not truncated: {}", err.message.len());

        let err = RemoteError::from_status(429, "Too Many Requests");
        assert_eq!(err.class, ErrorClass::QuotaExhausted);
    }

    #[test]
    fn from_message_detects_resource_exhausted() {
        let err = RemoteError::from_message("RESOURCE_EXHAUSTED: quota for model exceeded");
        assert_eq!(err.class, ErrorClass::QuotaExhausted);
        assert_eq!(
            err.to_string(),
            "quota remote error: RESOURCE_EXHAUSTED: quota for model exceeded"
        );
    }
}
