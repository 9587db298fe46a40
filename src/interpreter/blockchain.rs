use primitive_types::U256;

use super::Interpreter;
use crate::arith;
use crate::error::ExecutionError;
use crate::gas;
use crate::storage::InterpreterStorage;

impl<S> Interpreter<S> {
    /// CALLDATALOAD: 32 bytes of calldata at the popped offset, zero-padded
    /// past the end.
    pub(crate) fn op_calldataload(&mut self) -> Result<(), ExecutionError> {
        let offset = self.stack.pop()?;

        let word = if offset > U256::from(usize::MAX) {
            U256::zero()
        } else {
            let offset = offset.as_usize();
            let mut buf = [0u8; 32];

            if offset < self.context.calldata.len() {
                let available = self.context.calldata.len() - offset;
                let len = available.min(32);
                buf[..len].copy_from_slice(&self.context.calldata[offset..offset + len]);
            }

            arith::from_be_bytes(&buf)
        };

        self.stack.push(word)?;
        self.inc_pc(0);

        Ok(())
    }

    /// CALLDATACOPY / CODECOPY / EXTCODECOPY share this shape: expand the
    /// destination, charge per word, copy with implicit zero fill.
    fn copy_into_memory(&mut self, source: &[u8]) -> Result<(), ExecutionError> {
        let dest = self.stack.pop()?;
        let offset = self.pop_source_offset(source.len())?;
        let len = self.pop_offset()?;

        self.gas_charge(gas::copy_cost(len))?;

        if len > 0 {
            let dest = super::memory::to_offset(dest)?;

            self.charge_memory(dest, len)?;
            self.memory
                .write_padded(dest as usize, &source[offset..], len as usize);
        }

        self.inc_pc(0);

        Ok(())
    }

    /// CALLDATACOPY.
    pub(crate) fn op_calldatacopy(&mut self) -> Result<(), ExecutionError> {
        let calldata = self.context.calldata.clone();

        self.copy_into_memory(&calldata)
    }

    /// CODECOPY.
    pub(crate) fn op_codecopy(&mut self) -> Result<(), ExecutionError> {
        let code = bytes::Bytes::copy_from_slice(self.bytecode.as_slice());

        self.copy_into_memory(&code)
    }

    /// RETURNDATACOPY: unlike the other copies, reading past the end of the
    /// return-data buffer is an error, not zero fill.
    pub(crate) fn op_returndatacopy(&mut self) -> Result<(), ExecutionError> {
        let dest = self.stack.pop()?;
        let offset = self.stack.pop()?;
        let len = self.stack.pop()?;

        // The bound applies even to the offset of an empty read.
        let end = offset
            .checked_add(len)
            .ok_or(ExecutionError::ReturnDataOutOfBounds)?;

        if end > U256::from(self.returndata_buffer.len()) {
            return Err(ExecutionError::ReturnDataOutOfBounds);
        }

        let len = super::memory::to_offset(len)?;

        self.gas_charge(gas::copy_cost(len))?;

        if len > 0 {
            let dest = super::memory::to_offset(dest)?;
            let offset = offset.as_usize();

            self.charge_memory(dest, len)?;

            let data = self.returndata_buffer.clone();
            self.memory.write_padded(
                dest as usize,
                &data[offset..offset + len as usize],
                len as usize,
            );
        }

        self.inc_pc(0);

        Ok(())
    }

    /// RETURNDATASIZE.
    pub(crate) fn op_returndatasize(&mut self) -> Result<(), ExecutionError> {
        self.push(U256::from(self.returndata_buffer.len()))?;
        self.inc_pc(0);

        Ok(())
    }

    /// BLOBHASH: versioned hash at the popped index, zero out of range.
    pub(crate) fn op_blobhash(&mut self) -> Result<(), ExecutionError> {
        let index = self.stack.pop()?;

        let hash = if index < U256::from(self.block.blob_hashes.len()) {
            U256::from_big_endian(self.block.blob_hashes[index.as_usize()].as_bytes())
        } else {
            U256::zero()
        };

        self.stack.push(hash)?;
        self.inc_pc(0);

        Ok(())
    }

    /// Environment reads with no dynamic cost: push a value derived from
    /// the frame context or block env.
    pub(crate) fn env_push(&mut self, value: U256) -> Result<(), ExecutionError> {
        self.push(value)?;
        self.inc_pc(0);

        Ok(())
    }
}

impl<S> Interpreter<S>
where
    S: InterpreterStorage,
{
    /// BALANCE: account balance with EIP-2929 pricing.
    pub(crate) fn op_balance(&mut self) -> Result<(), ExecutionError> {
        let address = self.pop_address()?;
        let was_cold = self.access.borrow_mut().touch_address(address);

        self.gas_charge(gas::account_access_cost(was_cold))?;
        self.push(self.storage.balance(&address))?;
        self.inc_pc(0);

        Ok(())
    }

    /// SELFBALANCE: balance of the executing account, always warm.
    pub(crate) fn op_selfbalance(&mut self) -> Result<(), ExecutionError> {
        let balance = self.storage.balance(&self.context.callee);

        self.env_push(balance)
    }

    /// EXTCODESIZE with EIP-2929 pricing.
    pub(crate) fn op_extcodesize(&mut self) -> Result<(), ExecutionError> {
        let address = self.pop_address()?;
        let was_cold = self.access.borrow_mut().touch_address(address);

        self.gas_charge(gas::account_access_cost(was_cold))?;
        self.push(U256::from(self.storage.code(&address).len()))?;
        self.inc_pc(0);

        Ok(())
    }

    /// EXTCODEHASH with EIP-2929 pricing. Absent accounts hash to zero.
    pub(crate) fn op_extcodehash(&mut self) -> Result<(), ExecutionError> {
        let address = self.pop_address()?;
        let was_cold = self.access.borrow_mut().touch_address(address);

        self.gas_charge(gas::account_access_cost(was_cold))?;
        self.push(U256::from_big_endian(
            self.storage.code_hash(&address).as_bytes(),
        ))?;
        self.inc_pc(0);

        Ok(())
    }

    /// EXTCODECOPY with EIP-2929 pricing.
    pub(crate) fn op_extcodecopy(&mut self) -> Result<(), ExecutionError> {
        let address = self.pop_address()?;
        let was_cold = self.access.borrow_mut().touch_address(address);

        self.gas_charge(gas::account_access_cost(was_cold))?;

        let code = self.storage.code(&address);

        self.copy_into_memory(&code)
    }

    /// BLOCKHASH.
    pub(crate) fn op_blockhash(&mut self) -> Result<(), ExecutionError> {
        let number = self.stack.pop()?;
        let hash = self.storage.block_hash(number);

        self.push(U256::from_big_endian(hash.as_bytes()))?;
        self.inc_pc(0);

        Ok(())
    }

    /// SLOAD with EIP-2929 pricing; warms the slot.
    pub(crate) fn op_sload(&mut self) -> Result<(), ExecutionError> {
        let slot = self.stack.pop()?;
        let address = self.context.callee;
        let was_cold = self.access.borrow_mut().touch_slot(address, slot);

        self.gas_charge(gas::sload_cost(was_cold))?;
        self.push(self.storage.storage_read(&address, &slot))?;
        self.inc_pc(0);

        Ok(())
    }

    /// SSTORE under the London rules. Requires more gas left than the call
    /// stipend (EIP-2200), charges cold/set/reset pricing, and accrues the
    /// clearing refund.
    pub(crate) fn op_sstore(&mut self) -> Result<(), ExecutionError> {
        self.require_mutable()?;

        if self.gas_remaining <= gas::CALL_STIPEND {
            self.gas_remaining = 0;

            return Err(ExecutionError::OutOfGas);
        }

        let slot = self.stack.pop()?;
        let value = self.stack.pop()?;
        let address = self.context.callee;

        let was_cold = self.access.borrow_mut().touch_slot(address, slot);
        let current = self.storage.storage_read(&address, &slot);

        self.gas_charge(gas::sstore_cost(
            was_cold,
            current.is_zero(),
            current == value,
        ))?;

        if !current.is_zero() && value.is_zero() {
            self.refund += gas::SSTORE_CLEARS_REFUND;
        }

        self.storage.storage_write(&address, &slot, value);
        self.inc_pc(0);

        Ok(())
    }

    /// TLOAD (EIP-1153).
    pub(crate) fn op_tload(&mut self) -> Result<(), ExecutionError> {
        let slot = self.stack.pop()?;
        let value = self.storage.transient_read(&self.context.callee, &slot);

        self.push(value)?;
        self.inc_pc(0);

        Ok(())
    }

    /// TSTORE (EIP-1153).
    pub(crate) fn op_tstore(&mut self) -> Result<(), ExecutionError> {
        self.require_mutable()?;

        let slot = self.stack.pop()?;
        let value = self.stack.pop()?;
        let address = self.context.callee;

        self.storage.transient_write(&address, &slot, value);
        self.inc_pc(0);

        Ok(())
    }
}
