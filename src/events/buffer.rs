// Bounded FIFO of records waiting for the event store to come back

use crate::events::EventRecord;
use std::collections::VecDeque;

/// Outcome of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Buffer at capacity, record dropped
    Full,
    /// Recovery loop has exited, record dropped
    Closed,
}

/// Bounded FIFO buffer
///
/// Never grows past `capacity`. Not synchronized; the publisher keeps it
/// behind a single async mutex.
#[derive(Debug)]
pub struct PendingBuffer {
    records: VecDeque<EventRecord>,
    capacity: usize,
    closed: bool,
}

impl PendingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
            closed: false,
        }
    }

    pub fn try_push(&mut self, record: EventRecord) -> PushOutcome {
        if self.closed {
            return PushOutcome::Closed;
        }
        if self.records.len() >= self.capacity {
            return PushOutcome::Full;
        }
        self.records.push_back(record);
        PushOutcome::Queued
    }

    /// Put a record back at the head after a failed drain write
    pub fn push_front(&mut self, record: EventRecord) {
        self.records.push_front(record);
    }

    pub fn pop_front(&mut self) -> Option<EventRecord> {
        self.records.pop_front()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
