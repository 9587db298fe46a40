//! State comparison between the fast snapshot and the reference machine

use itertools::Itertools;

use crate::error::DivergenceError;
use crate::interpreter::Interpreter;
use crate::observer::FastSnapshot;

/// Compare stack length and every word the snapshot carries. The snapshot
/// holds the top of the stack top-first and may be truncated; only the
/// present prefix is compared.
pub(crate) fn diff_stack<S>(
    fast: &FastSnapshot,
    reference: &Interpreter<S>,
) -> Option<DivergenceError> {
    let stack = reference.stack();

    if fast.stack_len != stack.len() {
        let index = fast.stack_len.min(stack.len());

        return Some(DivergenceError::StackMismatch {
            index,
            fast: fast.stack_top.get(index).copied(),
            reference: stack.peek(index).ok(),
        });
    }

    for (index, (fast_word, reference_word)) in fast
        .stack_top
        .iter()
        .zip(stack.as_slice().iter().rev())
        .enumerate()
    {
        if fast_word != reference_word {
            return Some(DivergenceError::StackMismatch {
                index,
                fast: Some(*fast_word),
                reference: Some(*reference_word),
            });
        }
    }

    None
}

/// Compare memory size, and byte contents when the snapshot carries them.
pub(crate) fn diff_memory<S>(
    fast: &FastSnapshot,
    reference: &Interpreter<S>,
) -> Option<DivergenceError> {
    let memory = reference.memory();

    if fast.memory_len != memory.len() {
        let offset = fast.memory_len.min(memory.len());

        return Some(DivergenceError::MemoryMismatch {
            offset,
            fast: fast.memory.as_ref().and_then(|m| m.get(offset).copied()),
            reference: memory.get(offset).copied(),
        });
    }

    if let Some(fast_memory) = &fast.memory {
        if let Some((offset, (a, b))) = fast_memory
            .iter()
            .copied()
            .zip(memory.iter().copied())
            .find_position(|(a, b)| a != b)
        {
            return Some(DivergenceError::MemoryMismatch {
                offset,
                fast: Some(a),
                reference: Some(b),
            });
        }
    }

    None
}

/// Compare halt flags.
pub(crate) fn diff_halt<S>(
    fast: &FastSnapshot,
    reference: &Interpreter<S>,
) -> Option<DivergenceError> {
    let reference_halt = reference.status().halt_kind();

    if fast.halted != reference_halt {
        return Some(DivergenceError::HaltMismatch {
            fast: fast.halted,
            reference: reference_halt,
        });
    }

    None
}
