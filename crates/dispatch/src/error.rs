//! Dispatch errors
//!
//! `CallContract` absorbs every variant into a fallback result. They are only
//! visible to code that drives `ResilientDispatcher` directly.

use crate::events::FallbackReason;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Every usable slot hit its quota in one cycle, or the breaker was
    /// already tripped (`tried == 0`).
    #[error("all credential slots exhausted ({tried} tried)")]
    AllSlotsExhausted { tried: usize },

    /// Last quota signal observed when the attempt bound ran out.
    #[error("quota exhausted on slot {slot_id}: {cause}")]
    Quota { slot_id: String, cause: String },

    #[error("transient remote error on slot {slot_id}: {cause}")]
    Transient { slot_id: String, cause: String },

    #[error("fatal remote error on slot {slot_id}: {cause}")]
    Fatal { slot_id: String, cause: String },
}

impl Error {
    pub fn fallback_reason(&self) -> FallbackReason {
        match self {
            Error::AllSlotsExhausted { .. } => FallbackReason::Exhausted,
            Error::Quota { .. } => FallbackReason::Quota,
            Error::Transient { .. } => FallbackReason::Transient,
            Error::Fatal { .. } => FallbackReason::Fatal,
        }
    }
}

/// Result alias for dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;
