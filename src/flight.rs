//! Per-name single-flight coordination.
//!
//! Concurrent lookups of the same previously-unresolved name must not each
//! construct an artifact: one wins, the rest wait and observe its result.
//! [`FlightTable`] provides that guarantee with a keyed mutex, so lookups of
//! *different* names never block each other.

use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use rustc_hash::FxHashMap;

use crate::base::SymbolName;

/// Keyed mutex table: at most one lookup per name is in flight.
///
/// [`enter`](Self::enter) joins the name's slot (creating it if absent) and
/// blocks until the slot's lock is held. Distinct names contend only on the
/// brief table lock. Dropping the returned [`FlightPermit`] retires the slot
/// if it is still the registered one, so the table stays bounded by the set
/// of in-flight names.
#[derive(Default)]
pub(crate) struct FlightTable {
    slots: Mutex<FxHashMap<SymbolName, Arc<Mutex<()>>>>,
}

/// Exclusive permission to search and construct one name.
///
/// Held for the duration of a cold lookup; waiters for the same name block
/// in [`FlightTable::enter`] until this is dropped.
pub(crate) struct FlightPermit<'a> {
    table: &'a FlightTable,
    name: SymbolName,
    slot: Arc<Mutex<()>>,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl FlightTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block until this thread is the only in-flight lookup for `name`.
    pub(crate) fn enter(&self, name: &SymbolName) -> FlightPermit<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(name.clone()).or_default().clone()
        };
        let guard = slot.lock_arc();
        FlightPermit {
            table: self,
            name: name.clone(),
            slot,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.slots.lock().len()
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        // Retire the slot before releasing its lock. A waiter already parked
        // on this slot re-checks the resolved cache after waking; a later
        // arrival creates a fresh slot and does the same.
        let mut slots = self.table.slots.lock();
        if let Some(current) = slots.get(&self.name) {
            if Arc::ptr_eq(current, &self.slot) {
                slots.remove(&self.name);
            }
        }
        drop(slots);
        self.guard.take();
    }
}
