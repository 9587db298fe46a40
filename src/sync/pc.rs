//! Fast-cursor to reference-PC correlation

use std::collections::HashMap;

use crate::error::DivergenceError;

/// Tracks where the fast interpreter's opaque cursor sits in the bytecode.
///
/// The reference interpreter's PC is the single source of truth; the cursor
/// is only correlated against it. Statically resolved jumps reported by the
/// analysis hooks are verified against the PC the reference actually
/// reaches.
#[derive(Debug, Default)]
pub struct PcTracker {
    last_cursor: Option<usize>,
    instruction_pc: usize,
    stalled_dispatches: u64,
    static_jumps: HashMap<usize, usize>,
}

impl PcTracker {
    /// Fresh tracker for a frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an analysis-time resolved jump: the JUMP/JUMPI at `pc` targets
    /// `target`.
    pub fn note_static_jump(&mut self, pc: usize, target: usize) {
        self.static_jumps.insert(pc, target);
    }

    /// Called at `before_instruction`: remember where the reference stands
    /// for this dispatch and watch the cursor for forward progress.
    pub fn begin_dispatch(&mut self, cursor: usize, reference_pc: usize) {
        if self.last_cursor == Some(cursor) {
            // Legitimate loops revisit a cursor, but never without the
            // reference moving in between; a stall here means dropped
            // events.
            self.stalled_dispatches += 1;
            tracing::debug!(cursor, reference_pc, "fast cursor did not advance");
        }

        self.last_cursor = Some(cursor);
        self.instruction_pc = reference_pc;
    }

    /// Reference PC recorded at the start of the current dispatch.
    pub const fn instruction_pc(&self) -> usize {
        self.instruction_pc
    }

    /// Number of dispatches observed without cursor movement.
    pub const fn stalled_dispatches(&self) -> u64 {
        self.stalled_dispatches
    }

    /// Called after the reference advanced for a dispatch that left from a
    /// statically resolved jump site. A taken jump must land on the
    /// resolved target. `fall_through` is the PC of a not-taken JUMPI when
    /// the caller knows it; without it a non-target landing cannot be told
    /// apart from a fall-through inside a fused span and is not judged.
    pub fn verify_jump(
        &self,
        reference_pc: usize,
        fall_through: Option<usize>,
    ) -> Result<(), DivergenceError> {
        let target = match self.static_jumps.get(&self.instruction_pc) {
            Some(target) => *target,
            None => return Ok(()),
        };

        if reference_pc == target {
            return Ok(());
        }

        match fall_through {
            Some(pc) if reference_pc == pc => Ok(()),
            Some(_) => Err(DivergenceError::StaticJumpMismatch {
                fast: target,
                reference: reference_pc,
            }),
            None => Ok(()),
        }
    }
}
