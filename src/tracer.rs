//! Default tracer facade
//!
//! Combines the access-list tracker, the synchronization engine, the PC
//! tracker and the event writer behind the single [`Observer`] contract the
//! fast interpreter consumes. The tracer validates every frame it was given
//! bytecode for and emits the JSON Lines event stream as a side effect;
//! with no writer attached it validates silently.

use std::io::Write;

use bytes::Bytes;
use primitive_types::{H160, U256};

use crate::access::{self, SharedAccessList};
use crate::arena::FrameArena;
use crate::context::{BlockEnv, CallContext};
use crate::error::DivergenceError;
use crate::interpreter::{CallOutcome, Interpreter};
use crate::observer::{FastSnapshot, Observer};
use crate::opcode::DispatchCode;
use crate::state::HaltKind;
use crate::storage::{self, InterpreterStorage, SharedStorage};
use crate::sync::SyncEngine;
use crate::trace::{EventData, EventFilters, EventWriter, ExecutionOutcome};

/// Callback invoked on every detected divergence.
pub type DivergenceHandler = Box<dyn FnMut(&DivergenceError)>;

/// Bytecode and context for a frame the host is about to start.
#[derive(Debug, Clone)]
struct PendingFrame {
    code: Bytes,
    context: CallContext,
}

/// The default observer: differential validation plus trace emission.
pub struct DefaultTracer<S = SharedStorage>
where
    S: InterpreterStorage + Clone,
{
    storage: S,
    host_access: Option<SharedAccessList>,
    reference_access: SharedAccessList,
    block: BlockEnv,
    writer: Option<EventWriter>,
    arena: FrameArena,
    frames: Vec<Option<SyncEngine<S>>>,
    pending: Vec<PendingFrame>,
    pending_static_jumps: Vec<(usize, usize)>,
    divergence_handler: Option<DivergenceHandler>,
    divergent: bool,
    last_halt: Option<HaltKind>,
    aborted: bool,
    finished: bool,
}

impl DefaultTracer<SharedStorage> {
    /// Tracer emitting JSON Lines to `sink`.
    pub fn new(sink: Box<dyn Write>, filters: EventFilters) -> Self {
        Self::with_storage(storage::shared(), Some(EventWriter::new(sink, filters)))
    }

    /// Validation-only tracer: no writer, no event stream.
    pub fn validation_only() -> Self {
        Self::with_storage(storage::shared(), None)
    }
}

impl<S> DefaultTracer<S>
where
    S: InterpreterStorage + Clone,
{
    /// Tracer over an explicit storage backend.
    pub fn with_storage(storage: S, writer: Option<EventWriter>) -> Self {
        Self {
            storage,
            host_access: None,
            reference_access: access::shared(),
            block: BlockEnv::default(),
            writer,
            arena: FrameArena::default(),
            frames: Vec::new(),
            pending: Vec::new(),
            pending_static_jumps: Vec::new(),
            divergence_handler: None,
            divergent: false,
            last_halt: None,
            aborted: false,
            finished: false,
        }
    }

    /// Share the host's access-list tracker. The tracer only reads it, to
    /// verify membership against the reference's own warm/cold evolution;
    /// the reference interpreter replays every touch independently.
    pub fn set_access_list(&mut self, access: SharedAccessList) {
        self.host_access = Some(access);
    }

    /// The access list the reference interpreters evolve. Cleared at the
    /// transaction boundary together with transient storage.
    pub fn reference_access_list(&self) -> SharedAccessList {
        self.reference_access.clone()
    }

    /// Set the transaction/block environment for subsequent frames.
    pub fn set_block_env(&mut self, block: BlockEnv) {
        self.block = block;
    }

    /// Register the divergence callback.
    pub fn set_divergence_handler(&mut self, handler: DivergenceHandler) {
        self.divergence_handler = Some(handler);
    }

    /// Provide the bytecode and context of the next frame the host will
    /// start. Frames started without a prepared bytecode are traced but not
    /// validated.
    pub fn prepare_frame(&mut self, code: Bytes, context: CallContext) {
        self.pending.push(PendingFrame { code, context });
    }

    /// Return `true` once a divergence was detected. Subsequent events are
    /// marked, emission continues.
    pub const fn is_divergent(&self) -> bool {
        self.divergent
    }

    /// The event writer, while attached.
    pub fn writer(&self) -> Option<&EventWriter> {
        self.writer.as_ref()
    }

    /// Mutable writer access, e.g. to adjust filters between transactions.
    pub fn writer_mut(&mut self) -> Option<&mut EventWriter> {
        self.writer.as_mut()
    }

    /// The engine validating the innermost frame, if that frame was
    /// prepared.
    pub fn current_engine(&self) -> Option<&SyncEngine<S>> {
        self.frames.last().and_then(|frame| frame.as_ref())
    }

    /// Request cancellation: the next callback emits `execution_end` with
    /// status `aborted` and all further work stops.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Transaction boundary: clear the reference warm sets and transient
    /// storage, and re-arm the tracer for the next transaction's frames.
    pub fn end_transaction(&mut self) {
        self.reference_access.borrow_mut().clear();
        self.storage.clear_transient();
        self.frames.clear();
        self.pending.clear();
        self.pending_static_jumps.clear();
        self.last_halt = None;
        self.finished = false;
    }

    /// Idempotent teardown: flushes and releases the writer, the engines
    /// and the frame arena buffers.
    pub fn deinit(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.flush();
        }

        self.frames.clear();
        self.pending.clear();
        self.arena.reset();
        self.finished = true;
    }

    /// Emit one event through the filters, the arena and the writer.
    fn emit(&mut self, data: EventData) {
        if let Some(writer) = self.writer.as_mut() {
            writer.emit(&mut self.arena, data, self.divergent);

            #[cfg(feature = "debug-events")]
            if let Some(capacity) = self.arena.grew_to() {
                writer.emit(&mut self.arena, EventData::ArenaGrow { capacity }, self.divergent);
            }
        }
    }

    /// Handle an abort request or an already-finished stream. Returns
    /// `true` when the callback should do no further work.
    fn check_cancelled(&mut self) -> bool {
        if self.finished {
            return true;
        }

        if self.aborted {
            let gas_used = self
                .current_engine()
                .map(|engine| engine.reference().gas_used())
                .unwrap_or_default();

            self.emit(EventData::ExecutionEnd {
                status: ExecutionOutcome::Aborted,
                gas_used,
            });
            self.finished = true;

            return true;
        }

        false
    }

    /// Per-frame access-list membership check: the reference's warm sets
    /// must track the host's. A size drift here shows up as a gas mismatch
    /// at the next boundary; the warning names the cause earlier.
    fn verify_access_membership(&self) {
        if let Some(host) = &self.host_access {
            let host = host.borrow();
            let reference = self.reference_access.borrow();

            if host.address_count() != reference.address_count()
                || host.slot_count() != reference.slot_count()
            {
                tracing::warn!(
                    host_addresses = host.address_count(),
                    reference_addresses = reference.address_count(),
                    host_slots = host.slot_count(),
                    reference_slots = reference.slot_count(),
                    "access-list membership differs between interpreters"
                );
            }
        }
    }

    fn handle_divergence(&mut self, error: DivergenceError) {
        tracing::error!(%error, "interpreters diverged");

        if !self.divergent {
            self.divergent = true;
        }

        if let Some(handler) = self.divergence_handler.as_mut() {
            handler(&error);
        }
    }

    fn classify(&mut self, op: u16) -> Option<DispatchCode> {
        match DispatchCode::from_raw(op) {
            Some(code) => Some(code),
            None => {
                self.handle_divergence(DivergenceError::UnknownDispatch { code: op });

                None
            }
        }
    }

    /// Step-event payload from the reference machine after a successful
    /// sync, honoring the filters.
    fn step_event(&self, op: DispatchCode, report: &crate::sync::StepReport) -> EventData {
        let filters = self
            .writer
            .as_ref()
            .map(EventWriter::filters)
            .cloned()
            .unwrap_or_default();

        let (depth, stack, memory, memory_size) = match self.current_engine() {
            Some(engine) => {
                let reference = engine.reference();

                (
                    reference.context().depth,
                    filters.filter_stack(reference.stack().as_slice()),
                    filters.filter_memory(reference.memory()),
                    reference.memory().len(),
                )
            }
            None => (self.frames.len().saturating_sub(1), Vec::new(), None, 0),
        };

        EventData::Step {
            pc: report.pc,
            op: op.as_raw(),
            op_name: op.name().to_string(),
            gas: report.gas_before,
            depth,
            memory_size,
            stack,
            memory,
        }
    }

    /// Step-event payload built from the fast snapshot alone, used when the
    /// reference cannot be trusted after a divergence.
    fn step_event_from_snapshot(&self, op: u16, fast: &FastSnapshot) -> EventData {
        let name = DispatchCode::from_raw(op)
            .map(|code| code.name().to_string())
            .unwrap_or_else(|| format!("UNKNOWN(0x{op:x})"));

        EventData::Step {
            pc: fast.pc,
            op,
            op_name: name,
            gas: fast.gas_remaining,
            depth: self.frames.len().saturating_sub(1),
            memory_size: fast.memory_len,
            stack: fast.stack_top.clone(),
            memory: fast.memory.clone(),
        }
    }
}

// Hook parameters go unused when `debug-events` compiles their bodies out.
#[allow(unused_variables)]
impl<S> Observer for DefaultTracer<S>
where
    S: InterpreterStorage + Clone,
{
    fn on_frame_start(&mut self, code_len: usize, gas: u64, depth: usize) {
        if self.check_cancelled() {
            return;
        }

        if self.frames.is_empty() {
            #[cfg(feature = "debug-events")]
            self.emit(EventData::ArenaInit {
                capacity: self.arena.capacity(),
            });

            self.emit(EventData::ExecutionStart {
                code_len,
                gas,
                depth,
            });
        }

        let engine = if self.pending.is_empty() {
            tracing::debug!(depth, "frame started without prepared bytecode, not validated");

            None
        } else {
            let frame = self.pending.remove(0);
            let mut reference = Interpreter::with_storage(self.storage.clone(), frame.code, gas);

            reference.set_context(frame.context);
            reference.set_block_env(self.block.clone());
            reference.set_access_list(self.reference_access.clone());

            let mut engine = SyncEngine::new(reference);

            for (pc, target) in self.pending_static_jumps.drain(..) {
                engine.pc_tracker_mut().note_static_jump(pc, target);
            }

            Some(engine)
        };

        self.frames.push(engine);
        self.emit(EventData::FrameStart {
            depth,
            code_len,
            gas,
        });
    }

    fn on_frame_complete(&mut self, gas_left: u64, output_len: usize) {
        if self.check_cancelled() {
            return;
        }

        let gas_used = self
            .current_engine()
            .map(|engine| engine.reference().gas_used())
            .unwrap_or_default();

        self.emit(EventData::FrameComplete {
            gas_left,
            output_len,
        });
        self.frames.pop();

        #[cfg(feature = "debug-events")]
        {
            let capacity = self.arena.capacity();
            self.emit(EventData::ArenaReset { capacity });
        }
        self.arena.reset();

        if self.frames.is_empty() {
            let status = match self.last_halt {
                Some(HaltKind::Reverted) => ExecutionOutcome::Reverted,
                _ => ExecutionOutcome::Stopped,
            };

            self.emit(EventData::ExecutionEnd { status, gas_used });

            if let Some(writer) = self.writer.as_mut() {
                writer.flush();
            }

            self.finished = true;
        }
    }

    fn before_instruction(&mut self, op: u16, fast: &FastSnapshot) {
        if self.check_cancelled() {
            return;
        }

        let code = match self.classify(op) {
            Some(code) => code,
            None => return,
        };

        if let Some(Some(engine)) = self.frames.last_mut() {
            engine.before_instruction(code, fast);
        }
    }

    fn after_instruction(&mut self, op: u16, fast: &FastSnapshot) {
        if self.check_cancelled() {
            return;
        }

        let code = match self.classify(op) {
            Some(code) => code,
            None => return,
        };

        let outcome = match self.frames.last_mut() {
            Some(Some(engine)) => engine.after_instruction(code, fast),
            _ => {
                // Unvalidated frame: emit what the snapshot shows.
                let event = self.step_event_from_snapshot(op, fast);
                self.emit(event);

                return;
            }
        };

        match outcome {
            Ok(report) => {
                let event = self.step_event(code, &report);
                self.emit(event);
                self.verify_access_membership();

                if let Some(change) = report.storage_change {
                    self.emit(EventData::StorageChange {
                        address: change.address,
                        slot: change.slot,
                        previous: change.previous,
                        value: change.value,
                    });
                }

                if let Some(log) = report.log {
                    let data = self
                        .writer
                        .as_ref()
                        .map(EventWriter::filters)
                        .cloned()
                        .unwrap_or_default()
                        .filter_return_data(&log.data);

                    self.emit(EventData::Log {
                        address: log.address,
                        topics: log.topics,
                        data,
                    });
                }
            }
            Err(error) => {
                self.handle_divergence(error);

                let event = self.step_event_from_snapshot(op, fast);
                self.emit(event);
            }
        }
    }

    fn after_complete(&mut self, op: u16, fast: &FastSnapshot) {
        if self.check_cancelled() {
            return;
        }

        let code = match self.classify(op) {
            Some(code) => code,
            None => return,
        };

        let outcome = match self.frames.last_mut() {
            Some(Some(engine)) => engine.after_complete(code, fast),
            _ => {
                self.last_halt = fast.halted;

                return;
            }
        };

        match outcome {
            Ok(report) => {
                self.last_halt = Some(report.kind);

                let step = crate::sync::StepReport {
                    pc: report.pc,
                    gas_cost: report.gas_before - report.gas_left,
                    gas_before: report.gas_before,
                    gas_checked: true,
                    storage_change: None,
                    log: None,
                };
                let event = self.step_event(code, &step);
                self.emit(event);

                if matches!(report.kind, HaltKind::Reverted) {
                    let output = self
                        .writer
                        .as_ref()
                        .map(EventWriter::filters)
                        .cloned()
                        .unwrap_or_default()
                        .filter_return_data(&report.return_data);

                    self.emit(EventData::Revert {
                        depth: self.frames.len().saturating_sub(1),
                        gas_left: report.gas_left,
                        output,
                    });
                }
            }
            Err(error) => {
                self.last_halt = fast.halted;
                self.handle_divergence(error);
            }
        }
    }

    fn on_bytecode_analysis_start(&mut self, code_len: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::BytecodeAnalysisStart { code_len });
        }
    }

    fn on_bytecode_analysis_complete(&mut self, code_len: usize, jumpdest_count: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::BytecodeAnalysisComplete {
                code_len,
                jumpdest_count,
            });
        }
    }

    fn on_jumpdest_found(&mut self, pc: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::JumpdestFound { pc });
        }
    }

    fn on_invalid_opcode(&mut self, pc: usize, op: u8) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::InvalidOpcode { pc, op });
        }
    }

    fn on_truncated_push(&mut self, pc: usize, available: usize) {
        tracing::debug!(pc, available, "truncated push immediate");
    }

    fn on_schedule_build_start(&mut self, code_len: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::ScheduleBuildStart { code_len });
        }
    }

    fn on_schedule_build_complete(&mut self, instruction_count: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::ScheduleBuildComplete { instruction_count });
        }
    }

    fn on_fusion_detected(&mut self, pc: usize, op: u16, length: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            let op_name = DispatchCode::from_raw(op)
                .map(|code| code.name().to_string())
                .unwrap_or_else(|| format!("UNKNOWN(0x{op:x})"));

            self.emit(EventData::FusionDetected {
                pc,
                op_name,
                length,
            });
        }
    }

    fn on_static_jump_resolved(&mut self, pc: usize, target: usize) {
        if self.check_cancelled() {
            return;
        }

        if let Some(Some(engine)) = self.frames.last_mut() {
            engine.pc_tracker_mut().note_static_jump(pc, target);
        } else {
            // Analysis runs before the frame starts; the engine created at
            // frame start picks these up.
            self.pending_static_jumps.push((pc, target));
        }

        #[cfg(feature = "debug-events")]
        self.emit(EventData::StaticJumpResolved { pc, target });
    }

    fn on_static_jump_invalid(&mut self, pc: usize, target: usize) {
        tracing::debug!(pc, target, "statically resolved jump target is invalid");
    }

    fn on_call_preflight(&mut self, depth: usize, callee: H160) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::CallPreflight { depth, callee });
        }
    }

    fn on_call_start(&mut self, depth: usize, callee: H160, value: U256, input: &Bytes, gas: u64) {
        if self.check_cancelled() {
            return;
        }

        let caller = self
            .current_engine()
            .map(|engine| engine.reference().context().callee)
            .unwrap_or_default();
        let input_filtered = self
            .writer
            .as_ref()
            .map(EventWriter::filters)
            .cloned()
            .unwrap_or_default()
            .filter_return_data(input);

        self.emit(EventData::CallEnter {
            depth,
            caller,
            callee,
            value,
            gas,
            input: input_filtered,
        });

        #[cfg(feature = "debug-events")]
        self.emit(EventData::CallStart { depth, callee, gas });
    }

    fn on_call_complete(
        &mut self,
        depth: usize,
        success: bool,
        gas_left: u64,
        output: &Bytes,
        created: Option<H160>,
    ) {
        if self.check_cancelled() {
            return;
        }

        let output_filtered = self
            .writer
            .as_ref()
            .map(EventWriter::filters)
            .cloned()
            .unwrap_or_default()
            .filter_return_data(output);

        self.emit(EventData::CallExit {
            depth,
            success,
            gas_left,
            output: output_filtered,
        });

        #[cfg(feature = "debug-events")]
        self.emit(EventData::CallComplete {
            depth,
            success,
            gas_left,
        });

        // The parent's call-family opcode has not executed in the reference
        // yet; its after_instruction arrives next. Seed the outcome it will
        // observe, including the deployed address for an init frame.
        if let Some(Some(engine)) = self.frames.last_mut() {
            engine.reference_mut().set_call_outcome(CallOutcome {
                success,
                return_data: output.clone(),
                created: created.unwrap_or_default(),
            });
        }
    }

    fn on_arena_init(&mut self, capacity: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::ArenaInit { capacity });
        }
    }

    fn on_arena_grow(&mut self, capacity: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::ArenaGrow { capacity });
        }
    }

    fn on_arena_reset(&mut self, capacity: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::ArenaReset { capacity });
        }
    }

    fn on_arena_alloc_failed(&mut self, requested: usize) {
        #[cfg(feature = "debug-events")]
        {
            if self.check_cancelled() {
                return;
            }

            self.emit(EventData::ArenaAllocFailed { requested });
        }
    }
}

impl<S> Drop for DefaultTracer<S>
where
    S: InterpreterStorage + Clone,
{
    fn drop(&mut self) {
        self.deinit();
    }
}
