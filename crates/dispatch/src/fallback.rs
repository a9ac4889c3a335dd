//! Deterministic fallback responders
//!
//! A fallback is a pure function of the request, called only after remote
//! dispatch could not produce a value. It must always produce a value and
//! must never panic.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

/// Value and confidence produced by a fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackReply<T> {
    pub value: T,
    pub confidence: f64,
}

impl<T> FallbackReply<T> {
    pub fn new(value: T, confidence: f64) -> Self {
        Self { value, confidence }
    }
}

pub trait FallbackResponder<Req, Resp>: Send + Sync {
    fn respond(&self, request: &Req) -> FallbackReply<Resp>;
}

impl<Req, Resp, F> FallbackResponder<Req, Resp> for F
where
    F: Fn(&Req) -> FallbackReply<Resp> + Send + Sync,
{
    fn respond(&self, request: &Req) -> FallbackReply<Resp> {
        self(request)
    }
}

/// Same value for every request.
#[derive(Debug, Clone)]
pub struct StaticFallback<T> {
    reply: FallbackReply<T>,
}

impl<T> StaticFallback<T> {
    pub fn new(value: T, confidence: f64) -> Self {
        Self {
            reply: FallbackReply::new(value, confidence),
        }
    }
}

impl<Req, T> FallbackResponder<Req, T> for StaticFallback<T>
where
    T: Clone + Send + Sync,
{
    fn respond(&self, _request: &Req) -> FallbackReply<T> {
        self.reply.clone()
    }
}

/// Fallback that draws from an owned random source.
///
/// The rng is injected, never global: `seeded` makes the output sequence
/// reproducible.
pub struct RandomizedFallback<F> {
    rng: Mutex<StdRng>,
    build: F,
}

impl<F> RandomizedFallback<F> {
    pub fn seeded(seed: u64, build: F) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            build,
        }
    }

    pub fn new(build: F) -> Self {
        Self::seeded(rand::rng().random(), build)
    }
}

impl<F> std::fmt::Debug for RandomizedFallback<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomizedFallback").finish_non_exhaustive()
    }
}

impl<Req, Resp, F> FallbackResponder<Req, Resp> for RandomizedFallback<F>
where
    F: Fn(&Req, &mut StdRng) -> FallbackReply<Resp> + Send + Sync,
{
    fn respond(&self, request: &Req) -> FallbackReply<Resp> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        (self.build)(request, &mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_a_responder() {
        let fallback = |req: &String| FallbackReply::new(req.len(), 0.3);
        let reply = FallbackResponder::respond(&fallback, &"abcd".to_string());
        assert_eq!(reply, FallbackReply::new(4, 0.3));
    }

    #[test]
    fn static_fallback_is_request_independent() {
        let fallback = StaticFallback::new("neutral", 0.5);
        let a = FallbackResponder::<u32, _>::respond(&fallback, &1);
        let b = FallbackResponder::<u32, _>::respond(&fallback, &2);
        assert_eq!(a, b);
        assert_eq!(a.value, "neutral");
    }

    #[test]
    fn seeded_randomized_fallback_is_reproducible() {
        let build = |_: &(), rng: &mut StdRng| FallbackReply::new(rng.random_range(0..1000u32), 0.2);
        let a = RandomizedFallback::seeded(42, build);
        let b = RandomizedFallback::seeded(42, build);
        let seq_a: Vec<u32> = (0..5).map(|_| a.respond(&()).value).collect();
        let seq_b: Vec<u32> = (0..5).map(|_| b.respond(&()).value).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn randomized_fallback_sees_the_request() {
        let fallback = RandomizedFallback::new(|req: &u32, rng: &mut StdRng| {
            FallbackReply::new(*req + rng.random_range(0..1u32), 0.1)
        });
        assert_eq!(fallback.respond(&7).value, 7);
    }
}
