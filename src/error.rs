//! Runtime error types
//!
//! Execution errors are well-formed frame panics the reference interpreter
//! reports and the synchronization engine recovers; divergence errors mean
//! the two interpreters disagree and are fatal for the trace, never for the
//! observed execution.

use primitive_types::U256;
use thiserror::Error;

use crate::state::HaltKind;

/// Well-formed execution panics surfaced by the reference interpreter.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionError {
    /// Pop on an empty (or too shallow) stack.
    #[error("stack underflow")]
    StackUnderflow,
    /// Push on a full stack.
    #[error("stack overflow")]
    StackOverflow,
    /// The gas counter went below the charge.
    #[error("out of gas")]
    OutOfGas,
    /// Unassigned code byte, treated like INVALID after the error surfaces.
    #[error("invalid opcode 0x{0:02x}")]
    InvalidOpcode(u8),
    /// Jump target is not a valid JUMPDEST.
    #[error("invalid jump target {target}")]
    InvalidJump {
        /// The offset the jump attempted to reach.
        target: U256,
    },
    /// State-mutating opcode under a static call context.
    #[error("state write in static context")]
    WriteInStaticContext,
    /// Memory access past the addressable limit.
    #[error("memory limit exceeded")]
    MemoryLimitExceeded,
    /// RETURNDATACOPY past the end of the return-data buffer.
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,
}

/// Observable disagreement between the fast and reference interpreters at a
/// synchronization checkpoint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DivergenceError {
    /// Stack length or contents differ.
    #[error("stack mismatch at depth {index}: fast {fast:?}, reference {reference:?}")]
    StackMismatch {
        /// Distance from the top of the stack; a length mismatch reports the
        /// shorter length here.
        index: usize,
        /// Fast-interpreter word, if present at that depth.
        fast: Option<U256>,
        /// Reference word, if present at that depth.
        reference: Option<U256>,
    },
    /// Memory length or contents differ.
    #[error("memory mismatch at offset {offset}: fast {fast:?}, reference {reference:?}")]
    MemoryMismatch {
        /// First differing byte offset; a length mismatch reports the
        /// shorter length here.
        offset: usize,
        /// Fast-interpreter byte, if within its memory.
        fast: Option<u8>,
        /// Reference byte, if within its memory.
        reference: Option<u8>,
    },
    /// Cumulative gas differs at a basic-block boundary.
    #[error("gas mismatch at block boundary: fast used {fast}, reference used {reference}")]
    GasMismatch {
        /// Gas the fast interpreter reports as used since frame start.
        fast: u64,
        /// Gas the reference interpreter used since frame start.
        reference: u64,
    },
    /// The interpreters halted differently, or one halted and the other did
    /// not.
    #[error("halt mismatch: fast {fast:?}, reference {reference:?}")]
    HaltMismatch {
        /// Fast halt kind, `None` while it reports itself running.
        fast: Option<HaltKind>,
        /// Reference halt kind, `None` while it is running.
        reference: Option<HaltKind>,
    },
    /// Return data bytes differ on a terminal opcode.
    #[error("return data mismatch: fast {fast_len} bytes, reference {reference_len} bytes")]
    ReturnDataMismatch {
        /// Fast-interpreter return data length.
        fast_len: usize,
        /// Reference return data length.
        reference_len: usize,
    },
    /// The reference failed where the fast interpreter succeeded, or vice
    /// versa.
    #[error("error mismatch on {opcode}: fast {fast:?}, reference {reference:?}")]
    ErrorMismatch {
        /// Name of the opcode being synchronized.
        opcode: &'static str,
        /// Error the fast interpreter reported, if any.
        fast: Option<ExecutionError>,
        /// Error the reference interpreter reported, if any.
        reference: Option<ExecutionError>,
    },
    /// The fast interpreter dispatched a code the fusion table does not
    /// cover.
    #[error("unknown dispatch code 0x{code:x}")]
    UnknownDispatch {
        /// The raw dispatch code.
        code: u16,
    },
    /// A statically resolved jump target disagrees with the reference PC.
    #[error("static jump mismatch: fast resolved {fast}, reference jumped to {reference}")]
    StaticJumpMismatch {
        /// Target the fast interpreter resolved at analysis time.
        fast: usize,
        /// Target the reference interpreter actually reached.
        reference: usize,
    },
}

/// Top-level interpreter error.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// A frame panic during execution.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    /// A routine that requires a call context was invoked before
    /// `set_call_context`.
    #[error("call context not initialized")]
    CallContextNotInitialized,
}
