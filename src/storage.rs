//! Storage backend for the reference interpreter
//!
//! The real state database lives in the host; the reference interpreter only
//! needs a narrow view of it plus a place to mirror writes during a
//! transaction. [`MemoryStorage`] is that place and the default backend for
//! standalone execution and tests.

use std::collections::HashMap;

use bytes::Bytes;
use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

/// Storage view consumed by the reference interpreter.
///
/// Persistent slots survive across frames within a transaction; transient
/// slots (EIP-1153) are cleared at the transaction boundary. The remaining
/// methods are host-state views with neutral defaults so that a standalone
/// reference run does not require a host.
pub trait InterpreterStorage {
    /// Read a persistent storage slot. Absent keys are zero.
    fn storage_read(&self, address: &H160, slot: &U256) -> U256;

    /// Write a persistent storage slot, returning the previous value.
    fn storage_write(&mut self, address: &H160, slot: &U256, value: U256) -> U256;

    /// Read a transient storage slot. Absent keys are zero.
    fn transient_read(&self, address: &H160, slot: &U256) -> U256;

    /// Write a transient storage slot.
    fn transient_write(&mut self, address: &H160, slot: &U256, value: U256);

    /// Clear transient storage. Transaction boundary only.
    fn clear_transient(&mut self);

    /// Account balance.
    fn balance(&self, _address: &H160) -> U256 {
        U256::zero()
    }

    /// Account code.
    fn code(&self, _address: &H160) -> Bytes {
        Bytes::new()
    }

    /// Return `true` if the account exists on-chain. CALL charges the
    /// new-account surcharge when transferring value to an absent account.
    fn account_exists(&self, address: &H160) -> bool {
        !self.balance(address).is_zero() || !self.code(address).is_empty()
    }

    /// Keccak-256 of the account code; zero for absent accounts per
    /// EXTCODEHASH.
    fn code_hash(&self, address: &H160) -> H256 {
        let code = self.code(address);

        if code.is_empty() {
            H256::zero()
        } else {
            H256::from_slice(Keccak256::digest(&code).as_slice())
        }
    }

    /// Hash of a recent block; zero outside the host-visible window.
    fn block_hash(&self, _number: U256) -> H256 {
        H256::zero()
    }
}

/// A storage handle shared between the frames of a transaction.
pub type SharedStorage = std::rc::Rc<std::cell::RefCell<MemoryStorage>>;

/// Construct a fresh shared storage backend.
pub fn shared() -> SharedStorage {
    std::rc::Rc::new(std::cell::RefCell::new(MemoryStorage::new()))
}

impl<S> InterpreterStorage for std::rc::Rc<std::cell::RefCell<S>>
where
    S: InterpreterStorage,
{
    fn storage_read(&self, address: &H160, slot: &U256) -> U256 {
        self.borrow().storage_read(address, slot)
    }

    fn storage_write(&mut self, address: &H160, slot: &U256, value: U256) -> U256 {
        self.borrow_mut().storage_write(address, slot, value)
    }

    fn transient_read(&self, address: &H160, slot: &U256) -> U256 {
        self.borrow().transient_read(address, slot)
    }

    fn transient_write(&mut self, address: &H160, slot: &U256, value: U256) {
        self.borrow_mut().transient_write(address, slot, value)
    }

    fn clear_transient(&mut self) {
        self.borrow_mut().clear_transient()
    }

    fn balance(&self, address: &H160) -> U256 {
        self.borrow().balance(address)
    }

    fn code(&self, address: &H160) -> Bytes {
        self.borrow().code(address)
    }

    fn account_exists(&self, address: &H160) -> bool {
        self.borrow().account_exists(address)
    }

    fn code_hash(&self, address: &H160) -> H256 {
        self.borrow().code_hash(address)
    }

    fn block_hash(&self, number: U256) -> H256 {
        self.borrow().block_hash(number)
    }
}

/// In-memory storage backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    persistent: HashMap<(H160, U256), U256>,
    transient: HashMap<(H160, U256), U256>,
    balances: HashMap<H160, U256>,
    code: HashMap<H160, Bytes>,
}

impl MemoryStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account balance.
    pub fn set_balance(&mut self, address: H160, balance: U256) {
        self.balances.insert(address, balance);
    }

    /// Seed account code.
    pub fn set_code(&mut self, address: H160, code: Bytes) {
        self.code.insert(address, code);
    }

    /// Iterate over every non-zero persistent slot.
    pub fn persistent_slots(&self) -> impl Iterator<Item = (&(H160, U256), &U256)> {
        self.persistent.iter()
    }
}

impl InterpreterStorage for MemoryStorage {
    fn storage_read(&self, address: &H160, slot: &U256) -> U256 {
        self.persistent
            .get(&(*address, *slot))
            .copied()
            .unwrap_or_default()
    }

    fn storage_write(&mut self, address: &H160, slot: &U256, value: U256) -> U256 {
        if value.is_zero() {
            self.persistent.remove(&(*address, *slot)).unwrap_or_default()
        } else {
            self.persistent
                .insert((*address, *slot), value)
                .unwrap_or_default()
        }
    }

    fn transient_read(&self, address: &H160, slot: &U256) -> U256 {
        self.transient
            .get(&(*address, *slot))
            .copied()
            .unwrap_or_default()
    }

    fn transient_write(&mut self, address: &H160, slot: &U256, value: U256) {
        if value.is_zero() {
            self.transient.remove(&(*address, *slot));
        } else {
            self.transient.insert((*address, *slot), value);
        }
    }

    fn clear_transient(&mut self) {
        self.transient.clear();
    }

    fn balance(&self, address: &H160) -> U256 {
        self.balances.get(address).copied().unwrap_or_default()
    }

    fn code(&self, address: &H160) -> Bytes {
        self.code.get(address).cloned().unwrap_or_default()
    }
}
