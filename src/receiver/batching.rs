use crate::receiver::output::{OutputError, RecordTarget};
use crate::record::{Level, LogRecord};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// Sink shared between the listener loop and the shutdown path. The mutex is
/// the only way to reach the batch, so accept and flush never interleave.
pub type SharedSink<T> = Arc<Mutex<BatchingSink<T>>>;

/// Lock a shared sink, recovering the guard if a previous holder panicked.
/// Shutdown must still be able to flush in that case.
pub fn lock_sink<T>(sink: &Mutex<BatchingSink<T>>) -> MutexGuard<'_, BatchingSink<T>> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub accepted: u64,
    pub flushed: u64,
    pub pending: usize,
}

/// Buffers records and hands them to the target in arrival order.
///
/// With capacity 0 every record is written as it is accepted. Otherwise
/// records accumulate until the batch holds `capacity` of them (or one at or
/// above `flush_level` arrives), at which point the whole batch is written
/// and the batch starts over empty.
pub struct BatchingSink<T> {
    target: T,
    capacity: usize,
    flush_level: Option<Level>,
    batch: Vec<LogRecord>,
    closed: bool,
    accepted: u64,
    flushed: u64,
}

impl<T: RecordTarget> BatchingSink<T> {
    pub fn new(capacity: usize, target: T) -> Self {
        Self {
            target,
            capacity,
            flush_level: None,
            batch: Vec::with_capacity(capacity.min(10_000)),
            closed: false,
            accepted: 0,
            flushed: 0,
        }
    }

    /// Records at or above `level` force the pending batch out immediately.
    pub fn with_flush_level(mut self, level: Option<Level>) -> Self {
        self.flush_level = level;
        self
    }

    pub fn into_shared(self) -> SharedSink<T> {
        Arc::new(Mutex::new(self))
    }

    pub fn is_pass_through(&self) -> bool {
        self.capacity == 0
    }

    /// Take ownership of a decoded record. Returns `false` if the sink has
    /// already been closed, in which case the record is dropped.
    pub fn accept(&mut self, record: LogRecord) -> bool {
        if self.closed {
            debug!(logger = %record.name, "Sink closed, dropping record");
            return false;
        }
        self.accepted += 1;

        if self.is_pass_through() {
            self.deliver(&record);
            self.flushed += 1;
            return true;
        }

        let urgent = self.flush_level.is_some_and(|level| record.level >= level);
        self.batch.push(record);

        if urgent || self.batch.len() >= self.capacity {
            self.flush();
        }
        true
    }

    /// Drain everything buffered to the target, oldest first. Returns the
    /// number of records drained; a no-op on an empty batch.
    pub fn flush(&mut self) -> usize {
        if self.batch.is_empty() {
            return 0;
        }

        let batch = std::mem::take(&mut self.batch);
        let count = batch.len();
        for record in &batch {
            self.deliver(record);
        }
        self.flushed += count as u64;

        debug!(count, "Flushed batch");
        count
    }

    /// Flush what remains, close the target and refuse any further records.
    pub fn close(&mut self) -> Result<usize, OutputError> {
        let drained = self.flush();
        self.closed = true;
        self.target.close()?;
        Ok(drained)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            accepted: self.accepted,
            flushed: self.flushed,
            pending: self.batch.len(),
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    // A failed write loses only that record; the rest of the batch still goes out.
    fn deliver(&mut self, record: &LogRecord) {
        if let Err(e) = self.target.write(record) {
            error!(logger = %record.name, error = %e, "Failed to write record");
        }
    }
}
