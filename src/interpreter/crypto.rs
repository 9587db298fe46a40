use primitive_types::U256;
use sha3::{Digest, Keccak256};

use super::Interpreter;
use crate::error::ExecutionError;
use crate::gas;

impl<S> Interpreter<S> {
    /// KECCAK256: hash a memory region. Per-word cost plus expansion on top
    /// of the static base.
    pub(crate) fn op_keccak256(&mut self) -> Result<(), ExecutionError> {
        let (offset, len) = self.pop_region()?;

        self.gas_charge(gas::keccak_cost(len))?;
        self.charge_memory(offset, len)?;

        let digest = if len == 0 {
            Keccak256::digest([])
        } else {
            Keccak256::digest(self.memory.read(offset as usize, len as usize))
        };

        self.stack.push(U256::from_big_endian(digest.as_slice()))?;
        self.inc_pc(0);

        Ok(())
    }
}
