//! Reference interpreter implementation
//!
//! A program-counter-driven EVM that executes raw bytecode one opcode at a
//! time with exact gas accounting. It is deliberately simple: no dispatch
//! preprocessing, no fusion, no block-level gas batching. The
//! synchronization engine uses it as ground truth for the fast interpreter.

use bytes::Bytes;
use primitive_types::{H160, U256};

use crate::access::{self, SharedAccessList};
use crate::bytecode::Bytecode;
use crate::context::{BlockEnv, CallContext};
use crate::state::ExecutionStatus;
use crate::storage::MemoryStorage;

mod alu;
mod blockchain;
mod crypto;
mod executors;
mod flow;
mod frame;
mod internal;
mod log;
mod memory;
mod stack;

pub use frame::CallOutcome;
pub use log::LogEntry;
pub use memory::Memory;
pub use stack::Stack;

/// Reference EVM interpreter for a single call frame.
///
/// The machine state is not exposed mutably; consumers either drive it step
/// by step and inspect the read-only accessors, or run
/// [`execute`](Interpreter::execute) to completion and inspect the
/// resulting [`ProgramState`](crate::state::ProgramState).
#[derive(Debug, Clone)]
pub struct Interpreter<S = MemoryStorage> {
    pc: usize,
    stack: Stack,
    memory: Memory,
    bytecode: Bytecode,
    context: CallContext,
    block: BlockEnv,
    storage: S,
    access: SharedAccessList,
    gas_limit: u64,
    gas_remaining: u64,
    refund: u64,
    return_data: Bytes,
    returndata_buffer: Bytes,
    logs: Vec<LogEntry>,
    status: ExecutionStatus,
    call_outcome: CallOutcome,
}

impl Interpreter<MemoryStorage> {
    /// Initialize a machine over `code` with an empty stack, empty memory,
    /// PC zero and a full gas counter. The JUMPDEST bitset is computed here,
    /// once.
    pub fn init(code: Bytes, gas_limit: u64) -> Self {
        Self::with_storage(MemoryStorage::default(), code, gas_limit)
    }
}

impl<S> Interpreter<S> {
    /// Initialize over an explicit storage backend.
    pub fn with_storage(storage: S, code: Bytes, gas_limit: u64) -> Self {
        Self {
            pc: 0,
            stack: Stack::default(),
            memory: Memory::default(),
            bytecode: Bytecode::new(code),
            context: CallContext::default(),
            block: BlockEnv::default(),
            storage,
            access: access::shared(),
            gas_limit,
            gas_remaining: gas_limit,
            refund: 0,
            return_data: Bytes::new(),
            returndata_buffer: Bytes::new(),
            logs: Vec::new(),
            status: ExecutionStatus::Running,
            call_outcome: CallOutcome::default(),
        }
    }

    /// Set the immutable call-frame fields. Must be called before the first
    /// step.
    pub fn set_call_context(&mut self, caller: H160, callee: H160, value: U256, calldata: Bytes) {
        self.context = CallContext {
            caller,
            callee,
            value,
            calldata,
            ..self.context.clone()
        };
    }

    /// Replace the whole call context, including depth and static flag.
    pub fn set_context(&mut self, context: CallContext) {
        self.context = context;
    }

    /// Set the transaction/block environment.
    pub fn set_block_env(&mut self, block: BlockEnv) {
        self.block = block;
    }

    /// Share an access-list tracker with the host. The interpreter mirrors
    /// the host's warm/cold touches while stepping.
    pub fn set_access_list(&mut self, access: SharedAccessList) {
        self.access = access;
    }

    /// Current program counter.
    pub const fn pc(&self) -> usize {
        self.pc
    }

    /// Remaining gas.
    pub const fn gas_remaining(&self) -> u64 {
        self.gas_remaining
    }

    /// Gas consumed since frame start.
    pub const fn gas_used(&self) -> u64 {
        self.gas_limit - self.gas_remaining
    }

    /// Accumulated refund counter (EIP-3529 caps are the host's concern).
    pub const fn refund(&self) -> u64 {
        self.refund
    }

    /// Current stack, top last.
    pub const fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Current memory contents.
    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    /// The frame bytecode.
    pub const fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    /// The frame call context.
    pub const fn context(&self) -> &CallContext {
        &self.context
    }

    /// Halt flags.
    pub const fn status(&self) -> ExecutionStatus {
        self.status
    }

    /// Data set by RETURN or REVERT of this frame.
    pub const fn return_data(&self) -> &Bytes {
        &self.return_data
    }

    /// Logs emitted by this frame.
    pub fn logs(&self) -> &[LogEntry] {
        self.logs.as_slice()
    }

    /// The shared access-list tracker.
    pub fn access_list(&self) -> SharedAccessList {
        self.access.clone()
    }

    /// Push a word from outside the machine. Embedding and test setup
    /// only; execution itself never goes through here.
    pub fn push_external(&mut self, value: U256) -> Result<(), crate::error::ExecutionError> {
        self.stack.push(value)
    }

    /// Pop a word from outside the machine.
    pub fn pop_external(&mut self) -> Result<U256, crate::error::ExecutionError> {
        self.stack.pop()
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable storage access for host adapters.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

impl<S> AsRef<S> for Interpreter<S> {
    fn as_ref(&self) -> &S {
        &self.storage
    }
}

impl<S> AsMut<S> for Interpreter<S> {
    fn as_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}
