use primitive_types::U256;

use crate::arith;
use crate::consts::{MEMORY_LIMIT, MEMORY_QUANTUM, WORD_SIZE};
use crate::error::ExecutionError;
use crate::gas;

/// Byte-addressed frame memory.
///
/// Length is always a multiple of [`MEMORY_QUANTUM`]; any access grows it to
/// the smallest covering quantum and it never shrinks within a frame.
/// Growth is bounded by [`MEMORY_LIMIT`] and gas, whichever bites first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Current length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Return `true` if no access has grown the memory yet.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Current length in 32-byte words.
    pub fn word_count(&self) -> u64 {
        (self.bytes.len() / MEMORY_QUANTUM) as u64
    }

    /// Raw contents.
    pub fn as_slice(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Word count required to cover an access of `len` bytes at `offset`,
    /// or the current count for a zero-length access.
    pub fn required_words(&self, offset: u64, len: u64) -> Result<u64, ExecutionError> {
        if len == 0 {
            return Ok(self.word_count());
        }

        let end = offset
            .checked_add(len)
            .ok_or(ExecutionError::MemoryLimitExceeded)?;

        if end > MEMORY_LIMIT {
            return Err(ExecutionError::MemoryLimitExceeded);
        }

        Ok(gas::words_for(end).max(self.word_count()))
    }

    /// Grow to `words` 32-byte words. Never shrinks.
    pub fn grow_to(&mut self, words: u64) {
        let target = words as usize * MEMORY_QUANTUM;

        if target > self.bytes.len() {
            self.bytes.resize(target, 0);
        }
    }

    /// Read a 32-byte word. The caller has already grown the memory.
    pub fn read_word(&self, offset: usize) -> U256 {
        let mut buf = [0u8; WORD_SIZE];
        buf.copy_from_slice(&self.bytes[offset..offset + WORD_SIZE]);

        arith::from_be_bytes(&buf)
    }

    /// Write a 32-byte word.
    pub fn write_word(&mut self, offset: usize, value: U256) {
        let buf = arith::to_be_bytes(value);
        self.bytes[offset..offset + WORD_SIZE].copy_from_slice(&buf);
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, offset: usize, byte: u8) {
        self.bytes[offset] = byte;
    }

    /// Read `len` bytes starting at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> &[u8] {
        &self.bytes[offset..offset + len]
    }

    /// Copy `data` to `offset`, zero-filling the remainder of the `len`-byte
    /// region when `data` is shorter. The copy-family opcodes use this for
    /// their implicit zero padding.
    pub fn write_padded(&mut self, offset: usize, data: &[u8], len: usize) {
        let copy_len = data.len().min(len);

        self.bytes[offset..offset + copy_len].copy_from_slice(&data[..copy_len]);
        self.bytes[offset + copy_len..offset + len].fill(0);
    }

    /// MCOPY: overlapping copy within memory.
    pub fn copy_within(&mut self, dest: usize, src: usize, len: usize) {
        self.bytes.copy_within(src..src + len, dest);
    }
}

impl<S> super::Interpreter<S> {
    /// MLOAD.
    pub(crate) fn op_mload(&mut self) -> Result<(), ExecutionError> {
        let offset = self.pop_offset()?;

        self.charge_memory(offset, WORD_SIZE as u64)?;
        let word = self.memory.read_word(offset as usize);
        self.stack.push(word)?;
        self.inc_pc(0);

        Ok(())
    }

    /// MSTORE.
    pub(crate) fn op_mstore(&mut self) -> Result<(), ExecutionError> {
        let offset = self.pop_offset()?;
        let value = self.stack.pop()?;

        self.charge_memory(offset, WORD_SIZE as u64)?;
        self.memory.write_word(offset as usize, value);
        self.inc_pc(0);

        Ok(())
    }

    /// MSTORE8.
    pub(crate) fn op_mstore8(&mut self) -> Result<(), ExecutionError> {
        let offset = self.pop_offset()?;
        let value = self.stack.pop()?;

        self.charge_memory(offset, 1)?;
        self.memory.write_byte(offset as usize, value.byte(0));
        self.inc_pc(0);

        Ok(())
    }

    /// MCOPY (EIP-5656): per-word copy cost plus expansion over both
    /// regions.
    pub(crate) fn op_mcopy(&mut self) -> Result<(), ExecutionError> {
        let dest = self.stack.pop()?;
        let src = self.stack.pop()?;
        let len = self.pop_offset()?;

        self.gas_charge(gas::copy_cost(len))?;

        if len > 0 {
            let dest = to_offset(dest)?;
            let src = to_offset(src)?;

            self.charge_memory(src, len)?;
            self.charge_memory(dest, len)?;
            self.memory
                .copy_within(dest as usize, src as usize, len as usize);
        }

        self.inc_pc(0);

        Ok(())
    }

    /// MSIZE.
    pub(crate) fn op_msize(&mut self) -> Result<(), ExecutionError> {
        self.stack.push(U256::from(self.memory.len()))?;
        self.inc_pc(0);

        Ok(())
    }
}

/// Narrow a stack word to a memory offset. Anything past the addressable
/// limit fails before gas is considered.
pub(crate) fn to_offset(value: U256) -> Result<u64, ExecutionError> {
    if value > U256::from(MEMORY_LIMIT) {
        Err(ExecutionError::MemoryLimitExceeded)
    } else {
        Ok(value.as_u64())
    }
}
