use bytes::Bytes;
use primitive_types::{H160, U256};

use super::Interpreter;
use crate::error::ExecutionError;
use crate::gas;

/// A LOG0..LOG4 entry emitted by the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Emitting account.
    pub address: H160,
    /// Indexed topics, at most four.
    pub topics: Vec<U256>,
    /// Unindexed payload.
    pub data: Bytes,
}

impl<S> Interpreter<S> {
    /// LOGn: append a log entry with `topics` indexed words.
    pub(crate) fn op_log(&mut self, topics: usize) -> Result<(), ExecutionError> {
        self.require_mutable()?;

        let (offset, len) = self.pop_region()?;

        self.gas_charge(gas::log_cost(topics as u64, len) - gas::LOG)?;
        self.charge_memory(offset, len)?;

        let mut topic_words = Vec::with_capacity(topics);
        for _ in 0..topics {
            topic_words.push(self.stack.pop()?);
        }

        let data = if len == 0 {
            Bytes::new()
        } else {
            Bytes::copy_from_slice(self.memory.read(offset as usize, len as usize))
        };

        self.logs.push(LogEntry {
            address: self.context.callee,
            topics: topic_words,
            data,
        });
        self.inc_pc(0);

        Ok(())
    }
}
