use bytes::Bytes;
use primitive_types::U256;

use super::Interpreter;
use crate::error::ExecutionError;
use crate::state::{ExecuteState, HaltKind};

impl<S> Interpreter<S> {
    fn jump_to(&mut self, target: U256) -> Result<(), ExecutionError> {
        let valid = target <= U256::from(usize::MAX)
            && self.bytecode.is_valid_jumpdest(target.as_usize());

        if valid {
            self.pc = target.as_usize();

            Ok(())
        } else {
            Err(ExecutionError::InvalidJump { target })
        }
    }

    /// JUMP: unconditional transfer to a JUMPDEST.
    pub(crate) fn op_jump(&mut self) -> Result<(), ExecutionError> {
        let target = self.stack.pop()?;

        self.jump_to(target)
    }

    /// JUMPI: conditional transfer; a zero condition falls through.
    pub(crate) fn op_jumpi(&mut self) -> Result<(), ExecutionError> {
        let target = self.stack.pop()?;
        let condition = self.stack.pop()?;

        if condition.is_zero() {
            self.inc_pc(0);

            Ok(())
        } else {
            self.jump_to(target)
        }
    }

    /// PC: offset of this opcode.
    pub(crate) fn op_pc(&mut self) -> Result<(), ExecutionError> {
        self.stack.push(U256::from(self.pc))?;
        self.inc_pc(0);

        Ok(())
    }

    /// STOP: normal halt with empty return data.
    pub(crate) fn op_stop(&mut self) -> ExecuteState {
        self.halt(HaltKind::Stopped, Bytes::new())
    }

    /// RETURN: normal halt carrying a memory region as return data.
    pub(crate) fn op_return(&mut self) -> Result<ExecuteState, ExecutionError> {
        let data = self.pop_return_region()?;

        Ok(self.halt(HaltKind::Stopped, data))
    }

    /// REVERT: reverting halt carrying return data; remaining gas is
    /// preserved.
    pub(crate) fn op_revert(&mut self) -> Result<ExecuteState, ExecutionError> {
        let data = self.pop_return_region()?;

        Ok(self.halt(HaltKind::Reverted, data))
    }

    /// INVALID: designated invalid opcode. Consumes all remaining gas and
    /// reverts, as a well-formed halt rather than an error.
    pub(crate) fn op_invalid(&mut self) -> ExecuteState {
        self.gas_remaining = 0;

        self.halt(HaltKind::Reverted, Bytes::new())
    }

    /// SELFDESTRUCT: pops the beneficiary, warms it, halts. Balance movement
    /// is the host's concern.
    pub(crate) fn op_selfdestruct(&mut self) -> Result<ExecuteState, ExecutionError> {
        self.require_mutable()?;

        let beneficiary = self.pop_address()?;
        let was_cold = self.access.borrow_mut().touch_address(beneficiary);

        if was_cold {
            self.gas_charge(crate::gas::COLD_ACCOUNT_ACCESS)?;
        }

        Ok(self.halt(HaltKind::Stopped, Bytes::new()))
    }

    fn pop_return_region(&mut self) -> Result<Bytes, ExecutionError> {
        let (offset, len) = self.pop_region()?;

        self.charge_memory(offset, len)?;

        if len == 0 {
            Ok(Bytes::new())
        } else {
            Ok(Bytes::copy_from_slice(
                self.memory.read(offset as usize, len as usize),
            ))
        }
    }
}
