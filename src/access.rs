//! EIP-2929 warm/cold access tracking

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use primitive_types::{H160, U256};

/// Warm/cold bookkeeping of touched addresses and storage slots.
///
/// The sets grow monotonically within a transaction and are cleared only at
/// transaction boundaries. The host shares the tracker with the tracer; the
/// tracer only reads it, the reference interpreter mirrors the host's
/// touches while stepping.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    addresses: HashSet<H160>,
    slots: HashSet<(H160, U256)>,
}

impl AccessList {
    /// Empty tracker with both sets cold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `address` warm. Returns `true` if it was cold.
    pub fn touch_address(&mut self, address: H160) -> bool {
        self.addresses.insert(address)
    }

    /// Mark `(address, slot)` warm, warming the address as well. Returns
    /// `true` if the slot was cold.
    pub fn touch_slot(&mut self, address: H160, slot: U256) -> bool {
        self.addresses.insert(address);
        self.slots.insert((address, slot))
    }

    /// Return `true` if `address` is warm.
    pub fn is_warm_address(&self, address: &H160) -> bool {
        self.addresses.contains(address)
    }

    /// Return `true` if `(address, slot)` is warm.
    pub fn is_warm_slot(&self, address: &H160, slot: &U256) -> bool {
        self.slots.contains(&(*address, *slot))
    }

    /// Number of warm addresses.
    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }

    /// Number of warm slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Reset both sets. Transaction boundary only.
    pub fn clear(&mut self) {
        self.addresses.clear();
        self.slots.clear();
    }
}

/// Access tracker shared between the host and the tracer. Single-threaded by
/// design; observer callbacks run on the interpreter thread.
pub type SharedAccessList = Rc<RefCell<AccessList>>;

/// Construct a fresh shared tracker.
pub fn shared() -> SharedAccessList {
    Rc::new(RefCell::new(AccessList::new()))
}
