//! Credential slots and the ordered pool
//!
//! Insertion order is priority order. The pool keeps a `current_index` that
//! always points at a usable slot. Quota failures never disqualify a slot;
//! they are counted in `consecutive_failures` and every usable slot is
//! eligible again in the next dispatch cycle.

use std::collections::HashSet;

use common::Secret;
use tracing::{debug, info, warn};

use crate::credentials::SlotConfig;
use crate::error::{Error, Result};

/// One independently quota-metered credential.
#[derive(Debug)]
pub struct CredentialSlot {
    id: String,
    secret: Secret<String>,
    consecutive_failures: u32,
    usable: bool,
}

impl CredentialSlot {
    fn from_config(config: SlotConfig) -> Self {
        let usable = is_well_formed(config.secret.expose());
        if !usable {
            warn!(slot_id = %config.id, "malformed credential, slot marked unusable");
        }
        Self {
            id: config.id,
            secret: config.secret,
            consecutive_failures: 0,
            usable,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn secret(&self) -> &Secret<String> {
        &self.secret
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// False only when the slot could not be constructed (malformed secret).
    pub fn is_usable(&self) -> bool {
        self.usable
    }
}

/// A secret is well formed when it is non-empty and has no whitespace or
/// control characters.
fn is_well_formed(secret: &str) -> bool {
    !secret.is_empty() && !secret.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Ordered credential slots plus the shared "current" pointer.
#[derive(Debug)]
pub struct CredentialPool {
    slots: Vec<CredentialSlot>,
    current_index: usize,
}

impl CredentialPool {
    /// Build the pool from configured slots, preserving their order.
    ///
    /// Fails with `Configuration` when no slot is usable or when two slots
    /// share an id. The current pointer starts at the first usable slot.
    pub fn load(configured: Vec<SlotConfig>) -> Result<Self> {
        {
            let mut seen = HashSet::new();
            if let Some(dup) = configured.iter().find(|c| !seen.insert(c.id.as_str())) {
                return Err(Error::Configuration(format!(
                    "duplicate credential slot id: {}",
                    dup.id
                )));
            }
        }

        let slots: Vec<CredentialSlot> = configured
            .into_iter()
            .map(CredentialSlot::from_config)
            .collect();

        let Some(current_index) = slots.iter().position(|s| s.usable) else {
            return Err(Error::Configuration(format!(
                "no usable credentials found ({} configured)",
                slots.len()
            )));
        };

        let usable = slots.iter().filter(|s| s.usable).count();
        info!(
            slots = slots.len(),
            usable,
            current = %slots[current_index].id,
            "credential pool loaded"
        );

        Ok(Self {
            slots,
            current_index,
        })
    }

    /// The active slot. Never blocks.
    pub fn current(&self) -> &CredentialSlot {
        &self.slots[self.current_index]
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: a loaded pool holds at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn usable_len(&self) -> usize {
        self.slots.iter().filter(|s| s.usable).count()
    }

    pub fn slots(&self) -> &[CredentialSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&CredentialSlot> {
        self.slots.get(index)
    }

    /// Move to the next usable slot in ring order.
    ///
    /// Returns the (possibly unchanged) current slot and whether the pointer
    /// moved. Rotation is impossible with fewer than two usable slots. Bounding
    /// rotation to one ring per dispatch cycle is the caller's job, via
    /// `RotationPolicy` and `TriedSlots`.
    pub fn advance(&mut self) -> (&CredentialSlot, bool) {
        if self.usable_len() < 2 {
            return (self.current(), false);
        }
        let n = self.slots.len();
        let next = (1..n)
            .map(|offset| (self.current_index + offset) % n)
            .find(|&idx| self.slots[idx].usable);
        match next {
            Some(idx) => {
                self.current_index = idx;
                (self.current(), true)
            }
            None => (self.current(), false),
        }
    }

    /// Point the pool at a specific usable slot.
    pub fn advance_to(&mut self, index: usize) -> Result<&CredentialSlot> {
        match self.slots.get(index) {
            Some(slot) if slot.usable => {
                if index != self.current_index {
                    debug!(from = %self.current().id, to = %slot.id, "current slot moved");
                }
                self.current_index = index;
                Ok(self.current())
            }
            Some(slot) => Err(Error::SlotNotFound(format!("{} is not usable", slot.id))),
            None => Err(Error::SlotNotFound(format!("index {index}"))),
        }
    }

    /// Count a failed attempt. Returns the new consecutive failure count.
    pub fn record_failure(&mut self, slot_id: &str) -> Result<u32> {
        let slot = self.find_mut(slot_id)?;
        slot.consecutive_failures = slot.consecutive_failures.saturating_add(1);
        Ok(slot.consecutive_failures)
    }

    /// Reset the failure count after a successful attempt.
    pub fn record_success(&mut self, slot_id: &str) -> Result<()> {
        self.find_mut(slot_id)?.consecutive_failures = 0;
        Ok(())
    }

    pub fn index_of(&self, slot_id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.id == slot_id)
    }

    fn find_mut(&mut self, slot_id: &str) -> Result<&mut CredentialSlot> {
        self.slots
            .iter_mut()
            .find(|s| s.id == slot_id)
            .ok_or_else(|| Error::SlotNotFound(slot_id.to_string()))
    }
}
