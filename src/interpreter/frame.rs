use bytes::Bytes;
use primitive_types::{H160, U256};

use super::Interpreter;
use crate::error::ExecutionError;
use crate::gas;
use crate::opcode::Opcode;
use crate::storage::InterpreterStorage;

/// Outcome of a child frame, injected by the host.
///
/// Child frames execute in the host (each gets its own tracer frame); the
/// reference interpreter only models the parent-visible effect of the
/// call-family opcodes. Until the host reports the real outcome via
/// [`Interpreter::apply_call_result`], a call is assumed to succeed with
/// empty return data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    /// Word pushed for the call result: one on success, zero on failure.
    pub success: bool,
    /// Bytes placed in the return-data buffer.
    pub return_data: Bytes,
    /// Address pushed for CREATE/CREATE2, zero on failure.
    pub created: H160,
}

impl Default for CallOutcome {
    fn default() -> Self {
        Self {
            success: true,
            return_data: Bytes::new(),
            created: H160::zero(),
        }
    }
}

impl<S> Interpreter<S> {
    /// Set the outcome the next call-family opcode will observe.
    pub fn set_call_outcome(&mut self, outcome: CallOutcome) {
        self.call_outcome = outcome;
    }

    /// Patch the most recent call's observable effect after the host ran
    /// the child: rewrite the pushed status word and the return-data
    /// buffer. For embedders whose host reports the child outcome only
    /// after the call opcode already executed.
    pub fn apply_call_result(
        &mut self,
        success: bool,
        return_data: Bytes,
    ) -> Result<(), ExecutionError> {
        let status = self.stack.pop()?;

        debug_assert!(status <= U256::one());

        self.stack
            .push(if success { U256::one() } else { U256::zero() })?;
        self.returndata_buffer = return_data;

        Ok(())
    }
}

impl<S> Interpreter<S>
where
    S: InterpreterStorage,
{
    /// CALL / CALLCODE / DELEGATECALL / STATICCALL.
    ///
    /// Charges the parent-side costs (account access, value surcharge,
    /// memory expansion over both regions), consumes the argument words,
    /// zero-fills the return region and pushes the injected outcome. Gas
    /// forwarding to the child is the host's concern.
    pub(crate) fn op_call(&mut self, op: Opcode) -> Result<(), ExecutionError> {
        let has_value = matches!(op, Opcode::Call | Opcode::Callcode);

        let _gas = self.stack.pop()?;
        let target = self.pop_address()?;
        let value = if has_value { self.stack.pop()? } else { U256::zero() };
        let (args_offset, args_len) = self.pop_region()?;
        let (ret_offset, ret_len) = self.pop_region()?;

        if matches!(op, Opcode::Call) && !value.is_zero() {
            self.require_mutable()?;
        }

        let was_cold = self.access.borrow_mut().touch_address(target);

        self.gas_charge(gas::account_access_cost(was_cold))?;

        if !value.is_zero() {
            self.gas_charge(gas::CALL_VALUE)?;

            // Transferring value into an absent account makes the host
            // create it; only plain CALL can do that.
            if matches!(op, Opcode::Call) && !self.storage.account_exists(&target) {
                self.gas_charge(gas::NEW_ACCOUNT)?;
            }
        }

        self.charge_memory(args_offset, args_len)?;
        self.charge_memory(ret_offset, ret_len)?;

        let outcome = std::mem::take(&mut self.call_outcome);

        if ret_len > 0 {
            self.memory
                .write_padded(ret_offset as usize, &outcome.return_data, ret_len as usize);
        }

        self.returndata_buffer = outcome.return_data;
        self.stack.push(if outcome.success {
            U256::one()
        } else {
            U256::zero()
        })?;
        self.inc_pc(0);

        Ok(())
    }

    /// CREATE / CREATE2: charges the init-code costs and pushes the
    /// injected created address. The deployment itself runs in the host.
    pub(crate) fn op_create(&mut self, op: Opcode) -> Result<(), ExecutionError> {
        self.require_mutable()?;

        let _value = self.stack.pop()?;
        let (offset, len) = self.pop_region()?;
        let _salt = if matches!(op, Opcode::Create2) {
            Some(self.stack.pop()?)
        } else {
            None
        };

        self.gas_charge(gas::INITCODE_WORD * gas::words_for(len))?;

        if matches!(op, Opcode::Create2) {
            // CREATE2 hashes the init code for the address derivation.
            self.gas_charge(gas::KECCAK256_WORD * gas::words_for(len))?;
        }

        self.charge_memory(offset, len)?;

        let outcome = std::mem::take(&mut self.call_outcome);

        self.returndata_buffer = Bytes::new();
        self.push_address(if outcome.success {
            outcome.created
        } else {
            H160::zero()
        })?;
        self.inc_pc(0);

        Ok(())
    }
}
