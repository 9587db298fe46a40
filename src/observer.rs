//! Observer contract consumed by the fast interpreter
//!
//! The fast interpreter drives an abstract observer at its outer dispatch
//! loop; one dynamic-dispatch boundary there is amortized across the whole
//! instruction. Every hook has a default empty body so an implementation
//! may subscribe to any subset. Observers never mutate the observed
//! machine: the snapshot payload is the fast interpreter's public read-only
//! view.

use bytes::Bytes;
use primitive_types::{H160, U256};

use crate::state::HaltKind;

/// Observable state of the fast interpreter at a dispatch boundary.
///
/// This is the only channel through which the tracer sees the fast
/// machine; it never holds a reference into it.
#[derive(Debug, Clone, Default)]
pub struct FastSnapshot {
    /// Opaque dispatch-schedule cursor. Only used to correlate events and
    /// detect forward progress.
    pub cursor: usize,
    /// Bytecode offset the cursor corresponds to.
    pub pc: usize,
    /// Gas remaining in the frame. The fast interpreter batches gas per
    /// basic block, so between block boundaries this may exceed the true
    /// remaining gas.
    pub gas_remaining: u64,
    /// Number of words on the stack.
    pub stack_len: usize,
    /// Top of the stack, top first. May be truncated to the top `k` items;
    /// the diff compares only what is present.
    pub stack_top: Vec<U256>,
    /// Memory length in bytes.
    pub memory_len: usize,
    /// Memory contents, when the fast interpreter exports them.
    pub memory: Option<Bytes>,
    /// Halt flags, `None` while running.
    pub halted: Option<HaltKind>,
    /// Return data of a halted frame.
    pub return_data: Option<Bytes>,
}

/// Callbacks fired by the fast interpreter around dispatch, analysis and
/// host operations.
#[allow(unused_variables)]
pub trait Observer {
    /// A frame is about to execute.
    fn on_frame_start(&mut self, code_len: usize, gas: u64, depth: usize) {}

    /// A frame finished executing.
    fn on_frame_complete(&mut self, gas_left: u64, output_len: usize) {}

    /// Immediately before handler dispatch. `op` is the raw dispatch code;
    /// synthetic codes exceed `0xff`.
    fn before_instruction(&mut self, op: u16, fast: &FastSnapshot) {}

    /// Immediately after successful handler execution.
    fn after_instruction(&mut self, op: u16, fast: &FastSnapshot) {}

    /// After a terminal handler (STOP, RETURN, REVERT, INVALID,
    /// SELFDESTRUCT).
    fn after_complete(&mut self, op: u16, fast: &FastSnapshot) {}

    /// Bytecode analysis hooks.
    fn on_bytecode_analysis_start(&mut self, code_len: usize) {}
    /// Analysis finished; `jumpdest_count` valid destinations were found.
    fn on_bytecode_analysis_complete(&mut self, code_len: usize, jumpdest_count: usize) {}
    /// A valid JUMPDEST was found at `pc`.
    fn on_jumpdest_found(&mut self, pc: usize) {}
    /// An invalid opcode byte was found at `pc`.
    fn on_invalid_opcode(&mut self, pc: usize, op: u8) {}
    /// A PUSH immediate was truncated by the end of code.
    fn on_truncated_push(&mut self, pc: usize, available: usize) {}

    /// Schedule construction hooks.
    fn on_schedule_build_start(&mut self, code_len: usize) {}
    /// The dispatch schedule holds `instruction_count` slots.
    fn on_schedule_build_complete(&mut self, instruction_count: usize) {}
    /// A primitive sequence at `pc` was fused into synthetic opcode `op`.
    fn on_fusion_detected(&mut self, pc: usize, op: u16, length: usize) {}
    /// A jump at `pc` was resolved to `target` at analysis time.
    fn on_static_jump_resolved(&mut self, pc: usize, target: usize) {}
    /// A statically resolved jump at `pc` targets an invalid destination.
    fn on_static_jump_invalid(&mut self, pc: usize, target: usize) {}

    /// Host call hooks.
    fn on_call_preflight(&mut self, depth: usize, callee: H160) {}
    /// A child call is being dispatched by the host.
    fn on_call_start(&mut self, depth: usize, callee: H160, value: U256, input: &Bytes, gas: u64) {}
    /// A child call returned to the host. `created` carries the deployed
    /// address when the child was a CREATE/CREATE2 init frame; `None` for
    /// the plain call family.
    fn on_call_complete(
        &mut self,
        depth: usize,
        success: bool,
        gas_left: u64,
        output: &Bytes,
        created: Option<H160>,
    ) {
    }

    /// Host arena hooks.
    fn on_arena_init(&mut self, capacity: usize) {}
    /// The host arena grew to `capacity` bytes.
    fn on_arena_grow(&mut self, capacity: usize) {}
    /// The host arena was reset at a frame boundary.
    fn on_arena_reset(&mut self, capacity: usize) {}
    /// The host arena could not satisfy a `requested`-byte allocation.
    fn on_arena_alloc_failed(&mut self, requested: usize) {}
}

/// Observer that ignores every event. Stands in when tracing is disabled so
/// the fast interpreter's call sites stay unconditional.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
