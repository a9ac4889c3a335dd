//! Rotation decisions
//!
//! Pure logic: given the pool and the slots already tried in the current
//! dispatch cycle, decide where the next attempt goes. Rotation order is the
//! pool's insertion order, wrapping. A cycle is exhausted only after every
//! usable slot has been tried once, so one dispatch makes at most
//! `pool.len()` attempts.

use std::collections::HashSet;

use crate::pool::CredentialPool;

/// Where the next attempt of a dispatch cycle should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDecision {
    /// The pool's current slot has not been tried this cycle; use it without
    /// moving the pointer. Happens on the first attempt, and when a concurrent
    /// caller already rotated the shared pointer.
    Retry(usize),
    /// Move the pointer to this slot, then attempt it.
    RotateTo(usize),
    /// Every usable slot was tried this cycle.
    Exhausted,
}

/// Slot indices attempted within one dispatch cycle.
#[derive(Debug, Clone, Default)]
pub struct TriedSlots {
    tried: HashSet<usize>,
}

impl TriedSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the slot was already tried.
    pub fn insert(&mut self, index: usize) -> bool {
        self.tried.insert(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.tried.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.tried.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tried.is_empty()
    }
}

/// Deterministic ring-order rotation. No randomized or load-based selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotationPolicy;

impl RotationPolicy {
    pub fn decide(&self, pool: &CredentialPool, tried: &TriedSlots) -> RotationDecision {
        let current = pool.current_index();
        if !tried.contains(current) {
            return RotationDecision::Retry(current);
        }

        let n = pool.len();
        (1..n)
            .map(|offset| (current + offset) % n)
            .find(|&idx| {
                pool.slot(idx).is_some_and(|s| s.is_usable()) && !tried.contains(idx)
            })
            .map_or(RotationDecision::Exhausted, RotationDecision::RotateTo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::SlotConfig;

    fn pool_of(ids: &[&str]) -> CredentialPool {
        CredentialPool::load(ids.iter().map(|id| SlotConfig::new(*id, "k")).collect()).unwrap()
    }

    #[test]
    fn untried_current_is_retried_in_place() {
        let pool = pool_of(&["A", "B"]);
        let tried = TriedSlots::new();
        assert_eq!(RotationPolicy.decide(&pool, &tried), RotationDecision::Retry(0));
    }

    #[test]
    fn walks_ring_a_b_c_then_exhausts() {
        let mut pool = pool_of(&["A", "B", "C"]);
        let mut tried = TriedSlots::new();
        let mut visited = Vec::new();

        loop {
            let idx = match RotationPolicy.decide(&pool, &tried) {
                RotationDecision::Retry(i) => i,
                RotationDecision::RotateTo(i) => {
                    pool.advance_to(i).unwrap();
                    i
                }
                RotationDecision::Exhausted => break,
            };
            assert!(tried.insert(idx), "slot {idx} repeated within cycle");
            visited.push(pool.slot(idx).unwrap().id().to_string());
        }

        assert_eq!(visited, vec!["A", "B", "C"]);
        assert_eq!(tried.len(), 3);
    }

    #[test]
    fn starts_from_current_and_wraps() {
        let mut pool = pool_of(&["A", "B", "C"]);
        pool.advance_to(2).unwrap();
        let mut tried = TriedSlots::new();
        tried.insert(2);
        assert_eq!(
            RotationPolicy.decide(&pool, &tried),
            RotationDecision::RotateTo(0)
        );
    }

    #[test]
    fn single_slot_exhausts_without_rotation() {
        let pool = pool_of(&["PRIMARY"]);
        let mut tried = TriedSlots::new();
        tried.insert(0);
        assert_eq!(RotationPolicy.decide(&pool, &tried), RotationDecision::Exhausted);
    }

    #[test]
    fn unusable_slots_are_never_chosen() {
        let pool = CredentialPool::load(vec![
            SlotConfig::new("A", "a"),
            SlotConfig::new("B", "not usable"),
        ])
        .unwrap();
        let mut tried = TriedSlots::new();
        tried.insert(0);
        assert_eq!(RotationPolicy.decide(&pool, &tried), RotationDecision::Exhausted);
    }

    #[test]
    fn concurrent_rotation_to_untried_slot_is_retry() {
        // Another caller moved the pointer A -> B; this cycle only tried A.
        let mut pool = pool_of(&["A", "B", "C"]);
        pool.advance_to(1).unwrap();
        let mut tried = TriedSlots::new();
        tried.insert(0);
        assert_eq!(RotationPolicy.decide(&pool, &tried), RotationDecision::Retry(1));
    }

    #[test]
    fn concurrent_rotation_to_tried_slot_skips_it() {
        let mut pool = pool_of(&["A", "B", "C"]);
        pool.advance_to(1).unwrap();
        let mut tried = TriedSlots::new();
        tried.insert(0);
        tried.insert(1);
        assert_eq!(
            RotationPolicy.decide(&pool, &tried),
            RotationDecision::RotateTo(2)
        );
    }
}
