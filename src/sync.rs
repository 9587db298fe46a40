//! Synchronization engine
//!
//! Locksteps the reference interpreter against the fast interpreter's
//! dispatch events. A primitive dispatch advances the reference by exactly
//! one step; a synthetic dispatch by its fusion span. After every advance
//! the observable states are diffed. The engine only ever reads the fast
//! interpreter's snapshot; it never touches the observed machine.

use bytes::Bytes;
use primitive_types::{H160, U256};

use crate::error::{DivergenceError, ExecutionError};
use crate::interpreter::{Interpreter, LogEntry};
use crate::observer::FastSnapshot;
use crate::opcode::{DispatchCode, Opcode, SyntheticOpcode};
use crate::state::HaltKind;
use crate::storage::{InterpreterStorage, MemoryStorage};

mod diff;
mod pc;

pub use pc::PcTracker;

/// A storage slot transition observed while synchronizing an SSTORE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Account whose storage changed.
    pub address: H160,
    /// Storage slot.
    pub slot: U256,
    /// Value before the write.
    pub previous: U256,
    /// Value after the write.
    pub value: U256,
}

/// What one synchronized dispatch did, for event emission.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Bytecode offset the dispatch started at.
    pub pc: usize,
    /// Reference gas consumed by the dispatch.
    pub gas_cost: u64,
    /// Reference gas remaining before the dispatch.
    pub gas_before: u64,
    /// Whether cumulative gas was reconciled at this event.
    pub gas_checked: bool,
    /// Storage transition, when the dispatch was an SSTORE.
    pub storage_change: Option<StorageChange>,
    /// Log entry, when the dispatch was a LOG.
    pub log: Option<LogEntry>,
}

/// Outcome of a synchronized terminal dispatch.
#[derive(Debug, Clone)]
pub struct HaltReport {
    /// Bytecode offset of the terminal opcode.
    pub pc: usize,
    /// Reference gas remaining before the terminal opcode.
    pub gas_before: u64,
    /// How the frame halted.
    pub kind: HaltKind,
    /// Total reference gas consumed by the frame.
    pub gas_used: u64,
    /// Gas remaining at the halt.
    pub gas_left: u64,
    /// Return data of the frame.
    pub return_data: Bytes,
}

/// Drives the reference interpreter to the state logically equivalent to
/// each fast-interpreter dispatch and verifies equality.
#[derive(Debug)]
pub struct SyncEngine<S = MemoryStorage> {
    reference: Interpreter<S>,
    pc: PcTracker,
    frame_gas_limit: u64,
    expected_gas_used: u64,
    pending_storage: Option<(H160, U256, U256)>,
    logs_seen: usize,
}

impl<S> SyncEngine<S> {
    /// Engine over a freshly initialized reference interpreter.
    pub fn new(reference: Interpreter<S>) -> Self {
        let frame_gas_limit = reference.gas_remaining() + reference.gas_used();

        Self {
            reference,
            pc: PcTracker::new(),
            frame_gas_limit,
            expected_gas_used: 0,
            pending_storage: None,
            logs_seen: 0,
        }
    }

    /// Read-only view of the reference machine.
    pub fn reference(&self) -> &Interpreter<S> {
        &self.reference
    }

    /// Mutable reference access, used by the tracer to patch host-reported
    /// child-call outcomes.
    pub fn reference_mut(&mut self) -> &mut Interpreter<S> {
        &mut self.reference
    }

    /// Release the reference machine.
    pub fn into_reference(self) -> Interpreter<S> {
        self.reference
    }

    /// The PC tracker, for registering analysis-time static jumps.
    pub fn pc_tracker_mut(&mut self) -> &mut PcTracker {
        &mut self.pc
    }

    /// Reference cumulative gas recorded after the last synchronized
    /// dispatch; the authoritative figure between block boundaries.
    pub const fn expected_gas_used(&self) -> u64 {
        self.expected_gas_used
    }
}

impl<S> SyncEngine<S>
where
    S: InterpreterStorage,
{
    /// Record the pre-dispatch state. Does not advance the reference.
    pub fn before_instruction(&mut self, op: DispatchCode, fast: &FastSnapshot) {
        self.pc.begin_dispatch(fast.cursor, self.reference.pc());
        self.pending_storage = None;

        if let DispatchCode::Primitive(Opcode::Sstore) = op {
            if let Ok(slot) = self.reference.stack().peek(0) {
                let address = self.reference.context().callee;
                let previous = self.reference.storage().storage_read(&address, &slot);

                self.pending_storage = Some((address, slot, previous));
            }
        }
    }

    /// Advance the reference for a successfully dispatched non-terminal
    /// instruction, then diff the states.
    pub fn after_instruction(
        &mut self,
        op: DispatchCode,
        fast: &FastSnapshot,
    ) -> Result<StepReport, DivergenceError> {
        let pc = self.pc.instruction_pc();
        let gas_before_remaining = self.reference.gas_remaining();
        let gas_before = self.reference.gas_used();

        self.advance(op).map_err(|reference| {
            DivergenceError::ErrorMismatch {
                opcode: op.name(),
                fast: None,
                reference: Some(reference),
            }
        })?;

        self.pc
            .verify_jump(self.reference.pc(), fall_through_pc(op, pc))?;

        self.diff(op, fast)?;

        let storage_change = self.take_storage_change();
        let log = self.take_new_log();

        Ok(StepReport {
            pc,
            gas_cost: self.reference.gas_used() - gas_before,
            gas_before: gas_before_remaining,
            gas_checked: is_gas_boundary(op),
            storage_change,
            log,
        })
    }

    /// Synchronize a terminal dispatch: the reference must halt the same
    /// way with identical return data, and cumulative gas must reconcile.
    pub fn after_complete(
        &mut self,
        op: DispatchCode,
        fast: &FastSnapshot,
    ) -> Result<HaltReport, DivergenceError> {
        let pc = self.pc.instruction_pc();
        let gas_before = self.reference.gas_remaining();

        if let Err(reference) = self.advance(op) {
            // The reference raised an exceptional halt. That matches only a
            // fast frame that also ended reverted.
            if fast.halted != Some(HaltKind::Reverted) {
                return Err(DivergenceError::ErrorMismatch {
                    opcode: op.name(),
                    fast: None,
                    reference: Some(reference),
                });
            }
        }

        let reference_halt = self.reference.status().halt_kind();

        if fast.halted != reference_halt {
            return Err(DivergenceError::HaltMismatch {
                fast: fast.halted,
                reference: reference_halt,
            });
        }

        let reference_data = self.reference.return_data().clone();
        let fast_data = fast.return_data.clone().unwrap_or_default();

        if fast_data != reference_data {
            return Err(DivergenceError::ReturnDataMismatch {
                fast_len: fast_data.len(),
                reference_len: reference_data.len(),
            });
        }

        self.check_gas(fast)?;

        let kind = match reference_halt {
            Some(kind) => kind,
            // Unreachable: a terminal dispatch always halts the reference,
            // and the halt comparison above already rejected `None`.
            None => HaltKind::Stopped,
        };

        Ok(HaltReport {
            pc,
            gas_before,
            kind,
            gas_used: self.reference.gas_used(),
            gas_left: self.reference.gas_remaining(),
            return_data: reference_data,
        })
    }

    fn advance(&mut self, op: DispatchCode) -> Result<(), ExecutionError> {
        match op {
            DispatchCode::Primitive(op) => {
                self.reference.execute_opcode(op)?;
            }
            DispatchCode::Synthetic(op) => {
                for _ in 0..op.step_count() {
                    if !self.reference.status().is_running() {
                        break;
                    }

                    self.reference.step()?;
                }
            }
        }

        Ok(())
    }

    fn diff(&mut self, op: DispatchCode, fast: &FastSnapshot) -> Result<(), DivergenceError> {
        if let Some(e) = diff::diff_stack(fast, &self.reference) {
            return Err(e);
        }

        if let Some(e) = diff::diff_memory(fast, &self.reference) {
            return Err(e);
        }

        if let Some(e) = diff::diff_halt(fast, &self.reference) {
            return Err(e);
        }

        if is_gas_boundary(op) {
            self.check_gas(fast)?;
        }

        // Between boundaries the reference total is authoritative and
        // becomes the expectation for the next check.
        self.expected_gas_used = self.reference.gas_used();

        Ok(())
    }

    fn check_gas(&mut self, fast: &FastSnapshot) -> Result<(), DivergenceError> {
        let fast_used = self.frame_gas_limit.saturating_sub(fast.gas_remaining);
        let reference_used = self.reference.gas_used();

        if fast_used != reference_used {
            return Err(DivergenceError::GasMismatch {
                fast: fast_used,
                reference: reference_used,
            });
        }

        self.expected_gas_used = reference_used;

        Ok(())
    }

    fn take_storage_change(&mut self) -> Option<StorageChange> {
        let (address, slot, previous) = self.pending_storage.take()?;
        let value = self.reference.storage().storage_read(&address, &slot);

        Some(StorageChange {
            address,
            slot,
            previous,
            value,
        })
    }

    fn take_new_log(&mut self) -> Option<LogEntry> {
        let logs = self.reference.logs();

        if logs.len() > self.logs_seen {
            self.logs_seen = logs.len();

            logs.last().cloned()
        } else {
            None
        }
    }
}

/// Cumulative gas is compared only where the fast interpreter has settled
/// its per-block batch: block boundaries and terminal halts.
fn is_gas_boundary(op: DispatchCode) -> bool {
    match op {
        DispatchCode::Primitive(op) => op.is_gas_boundary(),
        DispatchCode::Synthetic(op) => matches!(
            op,
            SyntheticOpcode::PushJump
                | SyntheticOpcode::PushJumpi
                | SyntheticOpcode::IszeroJumpi
                | SyntheticOpcode::FunctionDispatch
        ),
    }
}

/// PC a not-taken conditional lands on, when it is knowable. Primitive
/// JUMP/JUMPI occupy a single byte; fused spans have variable immediates.
fn fall_through_pc(op: DispatchCode, pc: usize) -> Option<usize> {
    match op {
        DispatchCode::Primitive(Opcode::Jump) | DispatchCode::Primitive(Opcode::Jumpi) => {
            Some(pc + 1)
        }
        _ => None,
    }
}
