//! Scripted remote and fixtures for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keypool::{CredentialPool, SharedDispatchState, SlotConfig};
use remote::{CallCredential, CallFuture, RemoteCall, RemoteError, RemoteReply};

/// What a scripted slot does when called.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Reply(&'static str),
    ReplyWithConfidence(&'static str, f64),
    Quota,
    Transient,
    Fatal,
    /// Never answers within any sane timeout.
    Hang,
}

/// Remote whose behaviour is fixed per slot id. Unscripted slots fail fatally.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRemote {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, slot_id: &str, script: Script) -> Self {
        self.scripts.insert(slot_id.to_string(), script);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Slot ids in call order.
    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl RemoteCall<String, String> for ScriptedRemote {
    fn id(&self) -> &str {
        "scripted"
    }

    fn call<'a>(&'a self, credential: CallCredential<'a>, request: &'a String) -> CallFuture<'a, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(credential.slot_id.to_string());
        let script = self.scripts.get(credential.slot_id).cloned();
        Box::pin(async move {
            match script {
                Some(Script::Reply(v)) => Ok(RemoteReply::new(format!("{v}:{request}"))),
                Some(Script::ReplyWithConfidence(v, c)) => {
                    Ok(RemoteReply::new(format!("{v}:{request}")).with_confidence(c))
                }
                Some(Script::Quota) => Err(RemoteError::from_status(
                    429,
                    "RESOURCE_EXHAUSTED: quota exceeded",
                )),
                Some(Script::Transient) => Err(RemoteError::from_status(503, "unavailable")),
                Some(Script::Fatal) => Err(RemoteError::from_status(400, "invalid argument")),
                Some(Script::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(RemoteReply::new("late".to_string()))
                }
                None => Err(RemoteError::fatal("unscripted slot")),
            }
        })
    }
}

pub(crate) fn state_of(ids: &[&str]) -> Arc<SharedDispatchState> {
    let slots = ids
        .iter()
        .map(|id| SlotConfig::new(*id, format!("key-{id}")))
        .collect();
    Arc::new(SharedDispatchState::new(CredentialPool::load(slots).unwrap()))
}
