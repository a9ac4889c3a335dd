//! Resilient multi-credential dispatch with a deterministic fallback
//!
//! Pipeline stages depend on one contract only: `CallContract::invoke`, which
//! always returns a `CallResult` tagged with its provenance.
//!
//! Call flow:
//! 1. Breaker tripped → fallback immediately, zero remote calls
//! 2. Otherwise `ResilientDispatcher::dispatch` walks the credential ring:
//!    success returns, a quota signal rotates (with backoff) to the next
//!    untried slot, any other failure stops the cycle at once
//! 3. A cycle that tried every slot trips the breaker
//! 4. Any dispatch error becomes a fallback `CallResult`; stages never see it

pub mod contract;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod fallback;
pub mod result;

#[cfg(test)]
mod testing;

pub use contract::CallContract;
pub use dispatcher::{DispatchSettings, Dispatched, ResilientDispatcher};
pub use error::{Error, Result};
pub use events::{DispatchEvent, DispatchObserver, FallbackReason, NoopObserver, RecordingObserver};
pub use fallback::{FallbackReply, FallbackResponder, RandomizedFallback, StaticFallback};
pub use result::{CallResult, Provenance};
