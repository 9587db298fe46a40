use primitive_types::U256;

use super::Interpreter;
use crate::arith;
use crate::error::ExecutionError;
use crate::gas;
use crate::opcode::Opcode;
use crate::state::{ExecuteState, ProgramState};
use crate::storage::InterpreterStorage;

impl<S> Interpreter<S>
where
    S: InterpreterStorage,
{
    /// Fetch the opcode at PC, validate it, charge gas, execute, advance.
    ///
    /// Once halted, further calls return the same halt result without side
    /// effect. Running past the end of code is an implicit STOP. An
    /// unassigned code byte consumes all gas, reverts the frame and
    /// surfaces [`ExecutionError::InvalidOpcode`].
    pub fn step(&mut self) -> Result<ExecuteState, ExecutionError> {
        if let Some(kind) = self.status.halt_kind() {
            return Ok(ExecuteState::Halt(kind));
        }

        match self.bytecode.get(self.pc) {
            None => Ok(self.op_stop()),
            Some(byte) => match Opcode::from_u8(byte) {
                Some(op) => self.execute_opcode(op),
                None => {
                    self.exceptional_halt();

                    Err(ExecutionError::InvalidOpcode(byte))
                }
            },
        }
    }

    /// Execute `op` as if it were the byte at PC, without reading the code
    /// byte. PUSH opcodes still consume their immediates from the bytecode.
    ///
    /// The synchronization engine drives this directly when replaying a
    /// fast-interpreter dispatch.
    pub fn execute_opcode(&mut self, op: Opcode) -> Result<ExecuteState, ExecutionError> {
        if let Some(kind) = self.status.halt_kind() {
            return Ok(ExecuteState::Halt(kind));
        }

        match self.dispatch(op) {
            Ok(state) => Ok(state),
            Err(e) => {
                self.exceptional_halt();

                Err(e)
            }
        }
    }

    /// Repeatedly step until the frame halts. A no-op on an already-halted
    /// machine.
    pub fn execute(&mut self) -> Result<ProgramState, ExecutionError> {
        loop {
            if let ExecuteState::Halt(kind) = self.step()? {
                return Ok(ProgramState::new(
                    kind,
                    self.return_data.clone(),
                    self.gas_used(),
                ));
            }
        }
    }

    fn dispatch(&mut self, op: Opcode) -> Result<ExecuteState, ExecutionError> {
        use Opcode::*;

        self.gas_charge(gas::static_cost(op))?;

        match op {
            Stop => return Ok(self.op_stop()),
            Return => return self.op_return(),
            Revert => return self.op_revert(),
            Invalid => return Ok(self.op_invalid()),
            Selfdestruct => return self.op_selfdestruct(),

            Add => self.alu_binary(arith::add)?,
            Mul => self.alu_binary(arith::mul)?,
            Sub => self.alu_binary(arith::sub)?,
            Div => self.alu_binary(arith::div)?,
            Sdiv => self.alu_binary(arith::sdiv)?,
            Mod => self.alu_binary(arith::rem)?,
            Smod => self.alu_binary(arith::smod)?,
            Addmod => self.alu_ternary(arith::addmod)?,
            Mulmod => self.alu_ternary(arith::mulmod)?,
            Exp => self.op_exp()?,
            Signextend => self.alu_binary(arith::signextend)?,

            Lt => self.alu_cmp(|a, b| a < b)?,
            Gt => self.alu_cmp(|a, b| a > b)?,
            Slt => self.alu_cmp(arith::slt)?,
            Sgt => self.alu_cmp(arith::sgt)?,
            Eq => self.alu_cmp(|a, b| a == b)?,
            Iszero => self.alu_unary(|a| if a.is_zero() { U256::one() } else { U256::zero() })?,
            And => self.alu_binary(|a, b| a & b)?,
            Or => self.alu_binary(|a, b| a | b)?,
            Xor => self.alu_binary(|a, b| a ^ b)?,
            Not => self.alu_unary(|a| !a)?,
            Byte => self.alu_binary(arith::byte)?,
            Shl => self.alu_binary(arith::shl)?,
            Shr => self.alu_binary(arith::shr)?,
            Sar => self.alu_binary(arith::sar)?,

            Keccak256 => self.op_keccak256()?,

            Address => {
                let callee = self.context.callee;
                self.push_address(callee)?;
                self.inc_pc(0);
            }
            Origin => {
                let origin = self.block.origin;
                self.push_address(origin)?;
                self.inc_pc(0);
            }
            Caller => {
                let caller = self.context.caller;
                self.push_address(caller)?;
                self.inc_pc(0);
            }
            Callvalue => self.env_push(self.context.value)?,
            Calldataload => self.op_calldataload()?,
            Calldatasize => self.env_push(U256::from(self.context.calldata.len()))?,
            Calldatacopy => self.op_calldatacopy()?,
            Codesize => self.env_push(U256::from(self.bytecode.len()))?,
            Codecopy => self.op_codecopy()?,
            Gasprice => self.env_push(self.block.gas_price)?,
            Extcodesize => self.op_extcodesize()?,
            Extcodecopy => self.op_extcodecopy()?,
            Returndatasize => self.op_returndatasize()?,
            Returndatacopy => self.op_returndatacopy()?,
            Extcodehash => self.op_extcodehash()?,
            Balance => self.op_balance()?,

            Blockhash => self.op_blockhash()?,
            Coinbase => {
                let coinbase = self.block.coinbase;
                self.push_address(coinbase)?;
                self.inc_pc(0);
            }
            Timestamp => self.env_push(self.block.timestamp)?,
            Number => self.env_push(self.block.number)?,
            Prevrandao => self.env_push(U256::from_big_endian(self.block.prevrandao.as_bytes()))?,
            Gaslimit => self.env_push(U256::from(self.block.gas_limit))?,
            Chainid => self.env_push(U256::from(self.block.chain_id))?,
            Selfbalance => self.op_selfbalance()?,
            Basefee => self.env_push(self.block.base_fee)?,
            Blobhash => self.op_blobhash()?,
            Blobbasefee => self.env_push(self.block.blob_base_fee)?,

            Pop => {
                self.stack.pop()?;
                self.inc_pc(0);
            }
            Mload => self.op_mload()?,
            Mstore => self.op_mstore()?,
            Mstore8 => self.op_mstore8()?,
            Sload => self.op_sload()?,
            Sstore => self.op_sstore()?,
            Jump => self.op_jump()?,
            Jumpi => self.op_jumpi()?,
            Pc => self.op_pc()?,
            Msize => self.op_msize()?,
            Gas => {
                let gas = self.gas_remaining;
                self.env_push(U256::from(gas))?;
            }
            Jumpdest => self.inc_pc(0),
            Tload => self.op_tload()?,
            Tstore => self.op_tstore()?,
            Mcopy => self.op_mcopy()?,

            Push0 => {
                self.stack.push(U256::zero())?;
                self.inc_pc(0);
            }

            Create | Create2 => self.op_create(op)?,
            Call | Callcode | Delegatecall | Staticcall => self.op_call(op)?,

            _ => {
                if op.push_size() > 0 {
                    self.op_push(op.push_size())?;
                } else if op.dup_depth() > 0 {
                    self.stack.dup(op.dup_depth())?;
                    self.inc_pc(0);
                } else if op.swap_depth() > 0 {
                    self.stack.swap(op.swap_depth())?;
                    self.inc_pc(0);
                } else {
                    self.op_log(op.log_topics())?;
                }
            }
        }

        Ok(ExecuteState::Proceed)
    }

    /// PUSHn: read up to `size` immediate bytes. A truncated immediate at
    /// the end of code pads the low-order end of the value with zeros.
    fn op_push(&mut self, size: usize) -> Result<(), ExecutionError> {
        let immediate = self.bytecode.push_immediate(self.pc, size);
        let missing = size - immediate.len();
        let value = arith::from_be_slice(immediate) << (8 * missing);

        self.stack.push(value)?;
        self.inc_pc(size);

        Ok(())
    }
}
