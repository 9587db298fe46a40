//! Typed trace events

use bytes::Bytes;
use primitive_types::{H160, U256};
use serde::Serialize;

use super::encode;

/// One line of the event stream: a monotonic timestamp, the event tag, and
/// the tag-dependent payload. Events emitted after a divergence carry
/// `divergent: true`.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    /// Monotonic nanoseconds since writer initialization.
    pub timestamp: u64,
    /// Tag and payload.
    #[serde(flatten)]
    pub data: EventData,
    /// Set on every event after a divergence was detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergent: Option<bool>,
}

/// How a traced execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Ran to a normal halt.
    Stopped,
    /// Halted by REVERT or an exceptional condition.
    Reverted,
    /// The host cancelled execution mid-flight.
    Aborted,
}

/// The closed set of event payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventData {
    /// Top-level execution began.
    ExecutionStart {
        /// Frame bytecode length.
        code_len: usize,
        /// Gas available to the frame.
        #[serde(serialize_with = "encode::gas")]
        gas: u64,
        /// Call depth.
        depth: usize,
    },
    /// Top-level execution finished.
    ExecutionEnd {
        /// Outcome of the execution.
        status: ExecutionOutcome,
        /// Total gas consumed.
        #[serde(serialize_with = "encode::gas")]
        gas_used: u64,
    },
    /// One validated instruction.
    Step {
        /// Bytecode offset of the instruction.
        pc: usize,
        /// Raw dispatch code; synthetic codes exceed `0xff`.
        op: u16,
        /// Mnemonic of the dispatch code.
        op_name: String,
        /// Gas remaining before the instruction.
        #[serde(serialize_with = "encode::gas")]
        gas: u64,
        /// Call depth.
        depth: usize,
        /// Memory length in bytes.
        memory_size: usize,
        /// Stack snapshot, top first, capped by the filters.
        #[serde(serialize_with = "encode::words", skip_serializing_if = "Vec::is_empty")]
        stack: Vec<U256>,
        /// Memory contents when the filters include them.
        #[serde(
            serialize_with = "encode::byte_string_opt",
            skip_serializing_if = "Option::is_none"
        )]
        memory: Option<Bytes>,
    },
    /// A child frame was entered.
    CallEnter {
        /// Depth of the child frame.
        depth: usize,
        /// Calling account.
        #[serde(serialize_with = "encode::address")]
        caller: H160,
        /// Called account.
        #[serde(serialize_with = "encode::address")]
        callee: H160,
        /// Value transferred.
        #[serde(serialize_with = "encode::word")]
        value: U256,
        /// Gas given to the child.
        #[serde(serialize_with = "encode::gas")]
        gas: u64,
        /// Call input when the filters include it.
        #[serde(
            serialize_with = "encode::byte_string_opt",
            skip_serializing_if = "Option::is_none"
        )]
        input: Option<Bytes>,
    },
    /// A child frame returned.
    CallExit {
        /// Depth of the child frame.
        depth: usize,
        /// Whether the child succeeded.
        success: bool,
        /// Gas left in the child.
        #[serde(serialize_with = "encode::gas")]
        gas_left: u64,
        /// Child output when the filters include it.
        #[serde(
            serialize_with = "encode::byte_string_opt",
            skip_serializing_if = "Option::is_none"
        )]
        output: Option<Bytes>,
    },
    /// A persistent storage slot changed.
    StorageChange {
        /// Account whose storage changed.
        #[serde(serialize_with = "encode::address")]
        address: H160,
        /// Storage slot.
        #[serde(serialize_with = "encode::word")]
        slot: U256,
        /// Value before the write.
        #[serde(serialize_with = "encode::word")]
        previous: U256,
        /// Value after the write.
        #[serde(serialize_with = "encode::word")]
        value: U256,
    },
    /// A LOG opcode fired.
    Log {
        /// Emitting account.
        #[serde(serialize_with = "encode::address")]
        address: H160,
        /// Indexed topics.
        #[serde(serialize_with = "encode::words")]
        topics: Vec<U256>,
        /// Payload when the filters include it.
        #[serde(
            serialize_with = "encode::byte_string_opt",
            skip_serializing_if = "Option::is_none"
        )]
        data: Option<Bytes>,
    },
    /// A frame reverted.
    Revert {
        /// Depth of the reverting frame.
        depth: usize,
        /// Gas preserved for the caller.
        #[serde(serialize_with = "encode::gas")]
        gas_left: u64,
        /// Revert payload when the filters include it.
        #[serde(
            serialize_with = "encode::byte_string_opt",
            skip_serializing_if = "Option::is_none"
        )]
        output: Option<Bytes>,
    },
    /// The fast interpreter started analyzing a bytecode.
    BytecodeAnalysisStart {
        /// Bytecode length.
        code_len: usize,
    },
    /// Bytecode analysis finished.
    BytecodeAnalysisComplete {
        /// Bytecode length.
        code_len: usize,
        /// Number of valid jump destinations found.
        jumpdest_count: usize,
    },
    /// Analysis found a valid JUMPDEST.
    JumpdestFound {
        /// Offset of the marker byte.
        pc: usize,
    },
    /// Analysis fused a primitive sequence into a synthetic opcode.
    FusionDetected {
        /// Offset of the first fused instruction.
        pc: usize,
        /// Mnemonic of the synthetic opcode.
        op_name: String,
        /// Number of primitive opcodes covered.
        length: usize,
    },
    /// Analysis resolved a static jump target.
    StaticJumpResolved {
        /// Offset of the jump instruction.
        pc: usize,
        /// Resolved destination.
        target: usize,
    },
    /// Analysis saw an invalid opcode byte.
    InvalidOpcode {
        /// Offset of the byte.
        pc: usize,
        /// The raw byte.
        op: u8,
    },
    /// Dispatch-schedule construction began.
    ScheduleBuildStart {
        /// Bytecode length.
        code_len: usize,
    },
    /// Dispatch-schedule construction finished.
    ScheduleBuildComplete {
        /// Number of dispatch slots in the schedule.
        instruction_count: usize,
    },
    /// A frame began executing.
    FrameStart {
        /// Call depth.
        depth: usize,
        /// Frame bytecode length.
        code_len: usize,
        /// Gas available.
        #[serde(serialize_with = "encode::gas")]
        gas: u64,
    },
    /// A frame finished executing.
    FrameComplete {
        /// Gas left.
        #[serde(serialize_with = "encode::gas")]
        gas_left: u64,
        /// Output length in bytes.
        output_len: usize,
    },
    /// Trace arena initialized.
    ArenaInit {
        /// Capacity in bytes.
        capacity: usize,
    },
    /// Trace arena grew.
    ArenaGrow {
        /// New capacity in bytes.
        capacity: usize,
    },
    /// Trace arena was reset at a frame boundary.
    ArenaReset {
        /// Capacity retained across the reset.
        capacity: usize,
    },
    /// Trace arena could not satisfy an allocation.
    ArenaAllocFailed {
        /// Requested size in bytes.
        requested: usize,
    },
    /// Host is about to validate a call.
    CallPreflight {
        /// Depth of the prospective child.
        depth: usize,
        /// Target account.
        #[serde(serialize_with = "encode::address")]
        callee: H160,
    },
    /// Host began a child call.
    CallStart {
        /// Depth of the child.
        depth: usize,
        /// Target account.
        #[serde(serialize_with = "encode::address")]
        callee: H160,
        /// Gas forwarded.
        #[serde(serialize_with = "encode::gas")]
        gas: u64,
    },
    /// Host finished a child call.
    CallComplete {
        /// Depth of the child.
        depth: usize,
        /// Whether the child succeeded.
        success: bool,
        /// Gas left in the child.
        #[serde(serialize_with = "encode::gas")]
        gas_left: u64,
    },
}

impl EventData {
    /// The wire tag of this event, as written to the `type` field.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ExecutionStart { .. } => EventKind::ExecutionStart,
            Self::ExecutionEnd { .. } => EventKind::ExecutionEnd,
            Self::Step { .. } => EventKind::Step,
            Self::CallEnter { .. } => EventKind::CallEnter,
            Self::CallExit { .. } => EventKind::CallExit,
            Self::StorageChange { .. } => EventKind::StorageChange,
            Self::Log { .. } => EventKind::Log,
            Self::Revert { .. } => EventKind::Revert,
            Self::BytecodeAnalysisStart { .. } => EventKind::BytecodeAnalysisStart,
            Self::BytecodeAnalysisComplete { .. } => EventKind::BytecodeAnalysisComplete,
            Self::JumpdestFound { .. } => EventKind::JumpdestFound,
            Self::FusionDetected { .. } => EventKind::FusionDetected,
            Self::StaticJumpResolved { .. } => EventKind::StaticJumpResolved,
            Self::InvalidOpcode { .. } => EventKind::InvalidOpcode,
            Self::ScheduleBuildStart { .. } => EventKind::ScheduleBuildStart,
            Self::ScheduleBuildComplete { .. } => EventKind::ScheduleBuildComplete,
            Self::FrameStart { .. } => EventKind::FrameStart,
            Self::FrameComplete { .. } => EventKind::FrameComplete,
            Self::ArenaInit { .. } => EventKind::ArenaInit,
            Self::ArenaGrow { .. } => EventKind::ArenaGrow,
            Self::ArenaReset { .. } => EventKind::ArenaReset,
            Self::ArenaAllocFailed { .. } => EventKind::ArenaAllocFailed,
            Self::CallPreflight { .. } => EventKind::CallPreflight,
            Self::CallStart { .. } => EventKind::CallStart,
            Self::CallComplete { .. } => EventKind::CallComplete,
        }
    }
}

/// Discriminant of [`EventData`], used by the per-event-type filters.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ExecutionStart,
    ExecutionEnd,
    Step,
    CallEnter,
    CallExit,
    StorageChange,
    Log,
    Revert,
    BytecodeAnalysisStart,
    BytecodeAnalysisComplete,
    JumpdestFound,
    FusionDetected,
    StaticJumpResolved,
    InvalidOpcode,
    ScheduleBuildStart,
    ScheduleBuildComplete,
    FrameStart,
    FrameComplete,
    ArenaInit,
    ArenaGrow,
    ArenaReset,
    ArenaAllocFailed,
    CallPreflight,
    CallStart,
    CallComplete,
}
