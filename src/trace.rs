//! Trace event stream
//!
//! Structured, line-delimited JSON events in the `debug_traceTransaction`
//! convention, emitted as a side effect of validated execution. One JSON
//! object per line; every object carries `timestamp` (monotonic nanoseconds
//! since writer init), `type`, and a `type`-dependent `data` object.

mod encode;
mod event;
mod writer;

pub use event::{EventData, EventKind, ExecutionOutcome, TraceEvent};
pub use writer::{EventFilters, EventWriter, WriterState};
