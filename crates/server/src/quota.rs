//! Process-wide ceiling on model invocations.
//!
//! The counter starts at zero, goes up by exactly one for every model call
//! that is attempted, and never goes down; failed calls keep their slot.
//! It is not persisted, so a restart resets it.
//!
//! Reservation is a single compare-and-increment on an atomic, so two
//! requests racing for the last slot cannot both get it.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;

/// Point-in-time view of the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

impl QuotaSnapshot {
    fn new(used: u32, limit: u32) -> Self {
        Self {
            used,
            limit,
            remaining: limit.saturating_sub(used),
        }
    }
}

/// Outcome of asking for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// Slot taken; snapshot is after the increment
    Granted(QuotaSnapshot),
    /// Ceiling reached; nothing changed
    Denied(QuotaSnapshot),
}

/// Shared counter of model invocation attempts
#[derive(Debug)]
pub struct QuotaTracker {
    used: AtomicU32,
    limit: u32,
}

impl QuotaTracker {
    pub fn new(limit: u32) -> Self {
        Self {
            used: AtomicU32::new(0),
            limit,
        }
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        QuotaSnapshot::new(self.used.load(Ordering::SeqCst), self.limit)
    }

    /// Whether a slot is free right now. Does not reserve anything.
    pub fn has_capacity(&self) -> bool {
        self.used.load(Ordering::SeqCst) < self.limit
    }

    /// Take one slot if any remain
    pub fn try_reserve(&self) -> Reservation {
        let limit = self.limit;
        match self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < limit).then_some(used + 1)
            }) {
            Ok(previous) => Reservation::Granted(QuotaSnapshot::new(previous + 1, limit)),
            Err(current) => Reservation::Denied(QuotaSnapshot::new(current, limit)),
        }
    }
}
