//! The single call contract pipeline stages depend on
//!
//! `invoke` never fails: every dispatch error, and a tripped breaker, is
//! turned into a fallback `CallResult`. Callers tell the two apart through
//! `CallResult::source`.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::dispatcher::ResilientDispatcher;
use crate::events::{self, DispatchEvent, FallbackReason};
use crate::fallback::FallbackResponder;
use crate::result::CallResult;

pub struct CallContract<Req, Resp> {
    dispatcher: ResilientDispatcher<Req, Resp>,
    fallback: Arc<dyn FallbackResponder<Req, Resp>>,
}

impl<Req, Resp> CallContract<Req, Resp>
where
    Req: Sync,
    Resp: Send,
{
    pub fn new(
        dispatcher: ResilientDispatcher<Req, Resp>,
        fallback: Arc<dyn FallbackResponder<Req, Resp>>,
    ) -> Self {
        Self {
            dispatcher,
            fallback,
        }
    }

    pub fn dispatcher(&self) -> &ResilientDispatcher<Req, Resp> {
        &self.dispatcher
    }

    /// Produce a value for `request`, remotely if possible.
    ///
    /// With the breaker tripped the remote is not contacted at all.
    #[instrument(skip_all, fields(invocation_id = %new_invocation_id(), remote = self.dispatcher.remote_id()))]
    pub async fn invoke(&self, request: &Req) -> CallResult<Resp> {
        let started = Instant::now();

        let result = if self.dispatcher.state().breaker().is_tripped() {
            info!("breaker tripped, serving fallback without remote call");
            self.fall_back(request, FallbackReason::BreakerOpen, started)
        } else {
            match self.dispatcher.dispatch(request).await {
                Ok(dispatched) => CallResult::remote(
                    dispatched.reply.value,
                    dispatched.reply.confidence,
                    dispatched.slot_id,
                    elapsed_ms(started),
                ),
                Err(e) => {
                    warn!(error = %e, "remote dispatch failed, serving fallback");
                    self.fall_back(request, e.fallback_reason(), started)
                }
            }
        };

        events::record_invoke_duration(result.source(), started.elapsed().as_secs_f64());
        result
    }

    fn fall_back(&self, request: &Req, reason: FallbackReason, started: Instant) -> CallResult<Resp> {
        self.dispatcher.emit(DispatchEvent::Fallback { reason });
        let reply = self.fallback.respond(request);
        CallResult::fallback(reply.value, reply.confidence, elapsed_ms(started))
    }
}

impl<Req, Resp> std::fmt::Debug for CallContract<Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContract").finish_non_exhaustive()
    }
}

/// `inv_` + simple-form UUID v4.
fn new_invocation_id() -> String {
    format!("inv_{}", uuid::Uuid::new_v4().as_simple())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
