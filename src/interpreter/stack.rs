use primitive_types::U256;

use crate::consts::STACK_LIMIT;
use crate::error::ExecutionError;

/// Bounded LIFO word stack. Top is the last element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    items: Vec<U256>,
}

impl Stack {
    /// Push a word. Fails when the stack already holds
    /// [`STACK_LIMIT`] items.
    pub fn push(&mut self, value: U256) -> Result<(), ExecutionError> {
        if self.items.len() >= STACK_LIMIT {
            return Err(ExecutionError::StackOverflow);
        }

        self.items.push(value);

        Ok(())
    }

    /// Pop the top word.
    pub fn pop(&mut self) -> Result<U256, ExecutionError> {
        self.items.pop().ok_or(ExecutionError::StackUnderflow)
    }

    /// Word at `depth` from the top, zero-based.
    pub fn peek(&self, depth: usize) -> Result<U256, ExecutionError> {
        self.items
            .len()
            .checked_sub(depth + 1)
            .and_then(|index| self.items.get(index))
            .copied()
            .ok_or(ExecutionError::StackUnderflow)
    }

    /// DUPn: push a copy of the word at `depth - 1` from the top.
    pub fn dup(&mut self, depth: usize) -> Result<(), ExecutionError> {
        let value = self.peek(depth - 1)?;

        self.push(value)
    }

    /// SWAPn: exchange the top with the word `depth` below it.
    pub fn swap(&mut self, depth: usize) -> Result<(), ExecutionError> {
        let top = self
            .items
            .len()
            .checked_sub(1)
            .ok_or(ExecutionError::StackUnderflow)?;
        let other = top
            .checked_sub(depth)
            .ok_or(ExecutionError::StackUnderflow)?;

        self.items.swap(top, other);

        Ok(())
    }

    /// Number of words on the stack.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Return `true` if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All words, bottom first.
    pub fn as_slice(&self) -> &[U256] {
        self.items.as_slice()
    }
}
