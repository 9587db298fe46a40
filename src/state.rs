//! Machine execution states

use bytes::Bytes;

/// Halt flags of a frame. Transitions are strictly forward: once halted, a
/// machine never runs again and further steps are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionStatus {
    /// The machine accepts further steps.
    #[default]
    Running,
    /// Halted by STOP, RETURN or SELFDESTRUCT.
    Stopped,
    /// Halted by REVERT or an invalid opcode.
    Reverted,
}

impl ExecutionStatus {
    /// Return `true` if the machine accepts further steps.
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// The halt kind, or `None` while running.
    pub const fn halt_kind(&self) -> Option<HaltKind> {
        match self {
            Self::Running => None,
            Self::Stopped => Some(HaltKind::Stopped),
            Self::Reverted => Some(HaltKind::Reverted),
        }
    }
}

/// How a frame halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HaltKind {
    /// Normal completion; remaining gas is returned to the caller.
    Stopped,
    /// Execution reverted; state changes are discarded, remaining gas is
    /// preserved.
    Reverted,
}

/// Resulting state of a single instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecuteState {
    /// The machine should proceed with the next instruction.
    #[default]
    Proceed,
    /// The instruction halted the frame.
    Halt(HaltKind),
}

impl ExecuteState {
    /// Return `true` if execution should continue.
    pub const fn should_continue(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// Representation of a completed frame execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramState {
    kind: HaltKind,
    return_data: Bytes,
    gas_used: u64,
}

impl ProgramState {
    pub(crate) const fn new(kind: HaltKind, return_data: Bytes, gas_used: u64) -> Self {
        Self {
            kind,
            return_data,
            gas_used,
        }
    }

    /// How the frame halted.
    pub const fn kind(&self) -> HaltKind {
        self.kind
    }

    /// Bytes returned by RETURN or REVERT; empty otherwise.
    pub const fn return_data(&self) -> &Bytes {
        &self.return_data
    }

    /// Total gas consumed by the frame.
    pub const fn gas_used(&self) -> u64 {
        self.gas_used
    }

    /// Flag whether the caller should treat the frame as reverted.
    pub const fn should_revert(&self) -> bool {
        matches!(self.kind, HaltKind::Reverted)
    }
}
