use std::collections::HashSet;
use std::io::Write;
use std::time::Instant;

use bytes::Bytes;
use primitive_types::U256;

use super::event::{EventData, EventKind, TraceEvent};
use crate::arena::FrameArena;

/// Consecutive I/O failures after which the writer gives up and drops all
/// further events.
const PERSISTENT_FAILURE_THRESHOLD: u32 = 3;

/// What is emitted, never what is executed. Filters must not change
/// semantics.
#[derive(Debug, Clone)]
pub struct EventFilters {
    /// Include stack snapshots in `step` events.
    pub include_stack: bool,
    /// Cap on stack items per `step` event, top-down.
    pub max_stack_items: usize,
    /// Include full memory contents in `step` events.
    pub include_memory: bool,
    /// Include return/output byte strings in call and revert events.
    pub include_return_data: bool,
    disabled: HashSet<EventKind>,
}

impl Default for EventFilters {
    fn default() -> Self {
        Self {
            include_stack: true,
            max_stack_items: 16,
            include_memory: false,
            include_return_data: true,
            disabled: HashSet::new(),
        }
    }
}

impl EventFilters {
    /// Disable an event type entirely.
    pub fn disable(&mut self, kind: EventKind) -> &mut Self {
        self.disabled.insert(kind);

        self
    }

    /// Re-enable an event type.
    pub fn enable(&mut self, kind: EventKind) -> &mut Self {
        self.disabled.remove(&kind);

        self
    }

    /// Return `true` if events of this type are emitted.
    pub fn is_enabled(&self, kind: EventKind) -> bool {
        !self.disabled.contains(&kind)
    }

    /// Apply the stack filter to a snapshot, top first.
    pub(crate) fn filter_stack(&self, stack: &[U256]) -> Vec<U256> {
        if !self.include_stack {
            return Vec::new();
        }

        stack
            .iter()
            .rev()
            .take(self.max_stack_items)
            .copied()
            .collect()
    }

    /// Apply the memory filter.
    pub(crate) fn filter_memory(&self, memory: &[u8]) -> Option<Bytes> {
        self.include_memory.then(|| Bytes::copy_from_slice(memory))
    }

    /// Apply the return-data filter.
    pub(crate) fn filter_return_data(&self, data: &Bytes) -> Option<Bytes> {
        self.include_return_data.then(|| data.clone())
    }
}

/// Health of the underlying writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Events flow to the sink.
    Healthy,
    /// The sink failed persistently; events are counted and dropped while
    /// validation continues.
    Degraded,
}

/// JSON Lines event writer.
///
/// I/O failures are logged and drop the current event; they never propagate
/// into the interpreter's error path. Persistent failure degrades the
/// writer permanently for the rest of the transaction.
pub struct EventWriter {
    sink: Box<dyn Write>,
    filters: EventFilters,
    epoch: Instant,
    last_timestamp: u64,
    state: WriterState,
    consecutive_failures: u32,
    dropped: u64,
}

impl std::fmt::Debug for EventWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWriter")
            .field("filters", &self.filters)
            .field("state", &self.state)
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl EventWriter {
    /// Writer over `sink` with the given filters.
    pub fn new(sink: Box<dyn Write>, filters: EventFilters) -> Self {
        Self {
            sink,
            filters,
            epoch: Instant::now(),
            last_timestamp: 0,
            state: WriterState::Healthy,
            consecutive_failures: 0,
            dropped: 0,
        }
    }

    /// The active filters.
    pub fn filters(&self) -> &EventFilters {
        &self.filters
    }

    /// Mutable filter access.
    pub fn filters_mut(&mut self) -> &mut EventFilters {
        &mut self.filters
    }

    /// Current writer health.
    pub const fn state(&self) -> WriterState {
        self.state
    }

    /// Events dropped by filtering failures or degradation. Filtered-out
    /// event types are not counted; they were never owed to the stream.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Serialize and write one event line. `divergent` marks every event
    /// emitted after a detected divergence.
    pub fn emit(&mut self, arena: &mut FrameArena, data: EventData, divergent: bool) {
        if !self.filters.is_enabled(data.kind()) {
            return;
        }

        if matches!(self.state, WriterState::Degraded) {
            self.dropped += 1;

            return;
        }

        let event = TraceEvent {
            timestamp: self.next_timestamp(),
            data,
            divergent: divergent.then_some(true),
        };

        let scratch = arena.scratch();

        if serde_json::to_writer(&mut *scratch, &event).is_err() {
            // Serialization of an in-memory value only fails on a bug in
            // the event model; count and drop.
            self.dropped += 1;

            return;
        }

        scratch.push(b'\n');

        if !arena.within_limit() {
            tracing::warn!(
                used = arena.used(),
                limit = arena.limit(),
                "trace event exceeds arena limit, dropped"
            );
            self.dropped += 1;

            return;
        }

        match self.sink.write_all(arena.as_slice()) {
            Ok(()) => {
                self.consecutive_failures = 0;
            }
            Err(e) => {
                self.dropped += 1;
                self.consecutive_failures += 1;

                tracing::warn!(error = %e, "trace write failed, event dropped");

                if self.consecutive_failures >= PERSISTENT_FAILURE_THRESHOLD {
                    tracing::error!(
                        failures = self.consecutive_failures,
                        "trace sink failed persistently, writer degraded"
                    );
                    self.state = WriterState::Degraded;
                }
            }
        }
    }

    /// Flush the sink. Failures degrade like write failures.
    pub fn flush(&mut self) {
        if let Err(e) = self.sink.flush() {
            tracing::warn!(error = %e, "trace flush failed");
        }
    }

    fn next_timestamp(&mut self) -> u64 {
        let now = self.epoch.elapsed().as_nanos() as u64;

        // Monotonically non-decreasing even if the clock stalls.
        self.last_timestamp = self.last_timestamp.max(now);
        self.last_timestamp
    }
}
