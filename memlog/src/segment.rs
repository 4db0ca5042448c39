//! Fixed-capacity append-only record storage.

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::model::{Offset, Record};

/// Write failures internal to a segment.
///
/// `Full` triggers rotation in the log. `Sealed` outside of rotation means
/// the rotation invariants are broken and is never surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteError {
    Canceled,
    Sealed,
    Full,
}

/// An append-only container holding a contiguous range of record offsets.
///
/// Capacity is fixed at creation; segments are never resized or truncated,
/// only discarded whole. Record `i` holds offset `start + i`.
///
/// Not synchronized; the owning [`Log`](crate::Log) serializes access.
#[derive(Debug)]
pub(crate) struct Segment {
    start: Offset,
    sealed: bool,
    capacity: usize,
    data: Vec<Record>,
}

impl Segment {
    pub(crate) fn new(start: Offset, capacity: usize) -> Result<Self> {
        if start < 0 {
            return Err(Error::InvalidConfig(
                "start offset must not be negative".into(),
            ));
        }
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "capacity must be greater than 0".into(),
            ));
        }

        Ok(Self {
            start,
            sealed: false,
            capacity,
            data: Vec::with_capacity(capacity),
        })
    }

    /// Appends a record. The caller is responsible for ensuring the record's
    /// header offset matches the segment's next position.
    pub(crate) fn write(
        &mut self,
        cancel: &CancellationToken,
        record: &Record,
    ) -> std::result::Result<(), WriteError> {
        if cancel.is_cancelled() {
            return Err(WriteError::Canceled);
        }

        if self.sealed {
            return Err(WriteError::Sealed);
        }

        if self.data.len() == self.capacity {
            return Err(WriteError::Full);
        }

        self.data.push(record.clone());
        Ok(())
    }

    pub(crate) fn read(&self, cancel: &CancellationToken, offset: Offset) -> Result<&Record> {
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        let index = offset - self.start;
        if index < 0 || index >= self.data.len() as Offset {
            return Err(Error::OutOfRange);
        }

        Ok(&self.data[index as usize])
    }

    /// Closes the segment and sets it to read-only. Idempotent.
    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub(crate) fn start(&self) -> Offset {
        self.start
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    /// The last written offset, or -1 while the segment is empty.
    pub(crate) fn current_offset(&self) -> Offset {
        if self.data.is_empty() {
            return -1;
        }

        self.start + self.data.len() as Offset - 1
    }
}
