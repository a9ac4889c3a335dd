//! Credential pool for a quota-limited remote endpoint
//!
//! Holds interchangeable credentials for the same service and the shared state
//! every caller consults before spending a remote call:
//!
//! 1. Configuration supplies an ordered list of named secrets (`PRIMARY`,
//!    `BACKUP_1..N`) → `CredentialPool::load`
//! 2. Callers use the pool's current slot
//! 3. A quota signal records a failure and asks `RotationPolicy` for the next
//!    slot; `BackoffScheduler` paces the switch
//! 4. Once every slot has failed within one dispatch cycle the
//!    `ExhaustionBreaker` trips and stays tripped until an explicit reset
//!
//! `SharedDispatchState` bundles the pool and the breaker behind one lock so
//! that quota, a property of the credential, is shared by all callers.

pub mod backoff;
pub mod breaker;
pub mod credentials;
pub mod error;
pub mod pool;
pub mod rotation;
pub mod state;

pub use backoff::{BackoffConfig, BackoffScheduler};
pub use breaker::{ExhaustionBreaker, ExhaustionState};
pub use credentials::{CredentialSource, SlotConfig, slots_from_env, slots_from_lookup};
pub use error::{Error, Result};
pub use pool::{CredentialPool, CredentialSlot};
pub use rotation::{RotationDecision, RotationPolicy, TriedSlots};
pub use state::SharedDispatchState;
