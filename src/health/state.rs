//! Backend health table.
//!
//! # States
//! - Healthy: requests routed to the backend are forwarded
//! - Unhealthy: requests routed to the backend get 503
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: a probe fails
//! Unhealthy → Healthy: a probe succeeds
//! ```
//!
//! The table is a fixed arena with one slot per backend, indexed by the
//! backend's position in the set. A single reader/writer lock guards it:
//! many readers at once, writers exclusive. Slots are never added or removed.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::load_balancer::{Backend, BackendSet};

/// A change of a backend's health flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    BecameHealthy,
    BecameUnhealthy,
}

/// Shared health flags for a fixed backend set.
#[derive(Debug)]
pub struct HealthTable {
    slots: RwLock<Vec<bool>>,
}

impl HealthTable {
    /// Create a table of `len` slots, all optimistically healthy.
    pub fn new(len: usize) -> Self {
        Self {
            slots: RwLock::new(vec![true; len]),
        }
    }

    pub fn for_backends(backends: &BackendSet) -> Self {
        Self::new(backends.len())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Current flag of a backend.
    ///
    /// A backend outside the table reports unhealthy.
    pub fn is_healthy(&self, backend: &Backend) -> bool {
        let slots = self.read();
        debug_assert!(backend.index() < slots.len(), "backend outside health table");
        slots.get(backend.index()).copied().unwrap_or(false)
    }

    /// Set one backend's flag, returning the transition if it changed.
    pub fn set_health(&self, backend: &Backend, healthy: bool) -> Option<HealthTransition> {
        let mut slots = self.write();
        update_slot(&mut slots, backend.index(), healthy)
    }

    /// Apply a full probe sweep under one write lock.
    ///
    /// `results` pairs backend indexes with their new flag. Returns the
    /// backends whose flag changed.
    pub fn apply_sweep(&self, results: &[(usize, bool)]) -> Vec<(usize, HealthTransition)> {
        let mut slots = self.write();
        results
            .iter()
            .filter_map(|&(index, healthy)| {
                update_slot(&mut slots, index, healthy).map(|transition| (index, transition))
            })
            .collect()
    }

    /// Copy of every flag, in backend order.
    pub fn snapshot(&self) -> Vec<bool> {
        self.read().clone()
    }

    // A panic while holding the lock cannot leave a bool half-written, so a
    // poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Vec<bool>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<bool>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn update_slot(slots: &mut [bool], index: usize, healthy: bool) -> Option<HealthTransition> {
    let slot = slots.get_mut(index)?;
    if *slot == healthy {
        return None;
    }
    *slot = healthy;
    Some(if healthy {
        HealthTransition::BecameHealthy
    } else {
        HealthTransition::BecameUnhealthy
    })
}
