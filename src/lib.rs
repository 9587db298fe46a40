//! Differential EVM execution tracer.
//!
//! A dispatch-optimized ("fast") EVM interpreter is validated continuously
//! against a deliberately simple, bytecode-walking reference interpreter.
//! The fast interpreter reports dispatch events through the [`Observer`]
//! contract; the [`SyncEngine`] advances the reference by the equivalent
//! number of primitive steps and diffs the observable states; the
//! [`DefaultTracer`] facade emits the validated execution as a JSON Lines
//! event stream. The observer never perturbs the observed machine: no gas,
//! no state, no control flow.
//!
//! [`Observer`]: crate::observer::Observer
//! [`SyncEngine`]: crate::sync::SyncEngine
//! [`DefaultTracer`]: crate::tracer::DefaultTracer

#![warn(missing_docs)]

pub mod access;
pub mod arena;
pub mod arith;
pub mod bytecode;
pub mod consts;
pub mod context;
pub mod error;
pub mod gas;
pub mod interpreter;
pub mod observer;
pub mod opcode;
pub mod state;
pub mod storage;
pub mod sync;
pub mod trace;
pub mod tracer;

#[cfg(feature = "ffi")]
pub mod ffi;

pub mod prelude {
    //! Re-exports of the public surface.

    pub use primitive_types::{H160, H256, U256};

    pub use crate::access::{AccessList, SharedAccessList};
    pub use crate::arena::FrameArena;
    pub use crate::bytecode::Bytecode;
    pub use crate::context::{BlockEnv, CallContext};
    pub use crate::error::{DivergenceError, ExecutionError, InterpreterError};
    pub use crate::interpreter::{CallOutcome, Interpreter, LogEntry, Memory, Stack};
    pub use crate::observer::{FastSnapshot, NoopObserver, Observer};
    pub use crate::opcode::{DispatchCode, Opcode, SyntheticOpcode};
    pub use crate::state::{ExecuteState, ExecutionStatus, HaltKind, ProgramState};
    pub use crate::storage::{InterpreterStorage, MemoryStorage, SharedStorage};
    pub use crate::sync::{HaltReport, PcTracker, StepReport, StorageChange, SyncEngine};
    pub use crate::trace::{
        EventData, EventFilters, EventKind, EventWriter, ExecutionOutcome, TraceEvent, WriterState,
    };
    pub use crate::tracer::DefaultTracer;
}
