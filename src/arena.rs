//! Per-frame scratch arena for trace buffers
//!
//! Event serialization borrows its scratch space from here instead of
//! allocating per event. The arena is reset in O(1) at frame exit, keeping
//! its capacity. A configurable ceiling stands in for allocation failure:
//! an event that would grow the arena past it is dropped, never aborted on.

/// Default arena ceiling, in bytes.
pub const DEFAULT_ARENA_LIMIT: usize = 1 << 20;

/// Bump-style byte arena with a hard capacity ceiling.
#[derive(Debug)]
pub struct FrameArena {
    buf: Vec<u8>,
    limit: usize,
    high_water: usize,
}

impl Default for FrameArena {
    fn default() -> Self {
        Self::with_limit(DEFAULT_ARENA_LIMIT)
    }
}

impl FrameArena {
    /// Arena bounded by `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            high_water: 0,
        }
    }

    /// Borrow the scratch buffer, cleared. Length bookkeeping from the
    /// previous event is discarded; capacity is retained.
    pub fn scratch(&mut self) -> &mut Vec<u8> {
        self.buf.clear();

        &mut self.buf
    }

    /// Return `true` if the last event fit under the ceiling. Checked after
    /// serialization, before the buffer is handed to the writer.
    pub fn within_limit(&self) -> bool {
        self.buf.len() <= self.limit
    }

    /// Bytes the last event occupied.
    pub fn used(&self) -> usize {
        self.buf.len()
    }

    /// The last serialized event, untouched since [`scratch`](Self::scratch)
    /// was filled.
    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Current capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// The configured ceiling in bytes.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Capacity growth since the last call, if any. Lets the tracer emit
    /// `arena_grow` without tracking capacity at every call site.
    pub fn grew_to(&mut self) -> Option<usize> {
        if self.buf.capacity() > self.high_water {
            self.high_water = self.buf.capacity();

            Some(self.high_water)
        } else {
            None
        }
    }

    /// Reset at a frame boundary. O(1): the backing capacity is retained.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}
