use bytes::Bytes;
use primitive_types::U256;

use super::memory::to_offset;
use super::Interpreter;
use crate::error::ExecutionError;
use crate::gas;
use crate::state::{ExecuteState, ExecutionStatus, HaltKind};

impl<S> Interpreter<S> {
    /// Charge `amount` gas. On exhaustion the counter is zeroed before the
    /// error surfaces so that an exceptional frame always reports all gas
    /// consumed.
    pub(crate) fn gas_charge(&mut self, amount: u64) -> Result<(), ExecutionError> {
        if amount > self.gas_remaining {
            self.gas_remaining = 0;

            Err(ExecutionError::OutOfGas)
        } else {
            self.gas_remaining -= amount;

            Ok(())
        }
    }

    /// Charge the expansion cost of an access of `len` bytes at `offset` and
    /// grow memory accordingly. Zero-length accesses neither charge nor
    /// grow.
    pub(crate) fn charge_memory(&mut self, offset: u64, len: u64) -> Result<(), ExecutionError> {
        let old_words = self.memory.word_count();
        let new_words = self.memory.required_words(offset, len)?;

        self.gas_charge(gas::memory_expansion_cost(old_words, new_words))?;
        self.memory.grow_to(new_words);

        Ok(())
    }

    /// Pop a word destined to index memory.
    pub(crate) fn pop_offset(&mut self) -> Result<u64, ExecutionError> {
        to_offset(self.stack.pop()?)
    }

    /// Pop an `(offset, len)` memory region, in that pop order. The offset
    /// is only bounded for non-empty regions; a zero-length access is free
    /// at any offset.
    pub(crate) fn pop_region(&mut self) -> Result<(u64, u64), ExecutionError> {
        let offset = self.stack.pop()?;
        let len = self.pop_offset()?;

        if len == 0 {
            Ok((0, 0))
        } else {
            Ok((to_offset(offset)?, len))
        }
    }

    /// Pop a source offset for the copy family, clamped to the source
    /// length: reads past the end are implicit zeros, so any offset beyond
    /// the source behaves like its end.
    pub(crate) fn pop_source_offset(&mut self, source_len: usize) -> Result<usize, ExecutionError> {
        let offset = self.stack.pop()?;

        if offset > U256::from(source_len) {
            Ok(source_len)
        } else {
            Ok(offset.as_usize())
        }
    }

    /// Advance the PC past the opcode at `pc` and its immediate.
    pub(crate) fn inc_pc(&mut self, immediate: usize) {
        self.pc += 1 + immediate;
    }

    /// Halt the frame with `kind`, recording `return_data`.
    pub(crate) fn halt(&mut self, kind: HaltKind, return_data: Bytes) -> ExecuteState {
        self.status = match kind {
            HaltKind::Stopped => ExecutionStatus::Stopped,
            HaltKind::Reverted => ExecutionStatus::Reverted,
        };
        self.return_data = return_data;

        ExecuteState::Halt(kind)
    }

    /// Exceptional halt: all remaining gas is consumed and the frame
    /// reverts. Called for every surfaced [`ExecutionError`].
    pub(crate) fn exceptional_halt(&mut self) {
        self.gas_remaining = 0;
        self.status = ExecutionStatus::Reverted;
        self.return_data = Bytes::new();
    }

    /// Fail unless writes are allowed in this context.
    pub(crate) fn require_mutable(&self) -> Result<(), ExecutionError> {
        if self.context.is_static {
            Err(ExecutionError::WriteInStaticContext)
        } else {
            Ok(())
        }
    }

    /// Pop a word and truncate it to its low 20 bytes, as the address
    /// arguments of the account-touching opcodes are interpreted.
    pub(crate) fn pop_address(&mut self) -> Result<primitive_types::H160, ExecutionError> {
        let word = self.stack.pop()?;
        let bytes = crate::arith::to_be_bytes(word);

        Ok(primitive_types::H160::from_slice(&bytes[12..]))
    }

    /// Push helper shared by the environment handlers.
    pub(crate) fn push(&mut self, value: U256) -> Result<(), ExecutionError> {
        self.stack.push(value)
    }

    /// Push an address as a zero-extended word.
    pub(crate) fn push_address(&mut self, address: primitive_types::H160) -> Result<(), ExecutionError> {
        self.stack.push(U256::from_big_endian(address.as_bytes()))
    }
}
