//! Core log implementation with read and write APIs.
//!
//! This module provides the [`Log`] struct, the primary entry point of the
//! crate. It assigns offsets, enforces size limits, locates segments for
//! reads, and rotates segments when the active one fills up.

use std::sync::Arc;

use bytes::Bytes;
use common::clock::{Clock, SystemClock};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Header, Offset, Record};
use crate::segment::{Segment, WriteError};

/// Mutable state of the log, guarded by a single reader-writer lock.
///
/// Invariants:
/// - `active` exists for the life of the log.
/// - if `history` exists it is sealed and `history.start + segment_size ==
///   active.start`.
/// - `next_offset == active.current_offset() + 1` once the active segment is
///   non-empty, else `next_offset == active.start`.
struct LogInner {
    active: Segment,
    history: Option<Segment>,
    next_offset: Offset,
}

impl LogInner {
    /// Seals the active segment, drops any existing history, promotes the
    /// former active to history, and installs a fresh active segment
    /// starting at the next write offset.
    fn rotate(&mut self, segment_size: usize) -> Result<()> {
        self.active.seal();

        let fresh = Segment::new(self.next_offset, segment_size)?;
        self.history = Some(std::mem::replace(&mut self.active, fresh));
        Ok(())
    }

    /// Finds the segment holding `offset`: the active segment first, then
    /// the history window. Anything below the history window has been
    /// purged.
    fn locate(&self, offset: Offset, segment_size: usize) -> Result<&Segment> {
        if offset >= self.active.start() {
            if offset <= self.active.current_offset() {
                return Ok(&self.active);
            }
            return Err(Error::FutureOffset);
        }

        if let Some(history) = &self.history {
            let min = history.start();
            let max = history.start() + segment_size as Offset - 1;
            if min <= offset && offset <= max {
                return Ok(history);
            }
        }

        Err(Error::OutOfRange)
    }

    /// The earliest and latest available offsets, or `(-1, -1)` when the
    /// log is empty. After one or more purges, earliest points at the start
    /// of the history segment rather than the configured start offset.
    fn offset_range(&self, start_offset: Offset) -> (Offset, Offset) {
        match &self.history {
            None => {
                if self.active.current_offset() == -1 {
                    return (-1, -1);
                }
                (start_offset, self.active.current_offset())
            }
            Some(history) => (history.start(), self.active.current_offset()),
        }
    }
}

/// An append-only, bounded, in-memory log storing immutable records
/// addressed by monotonic offsets.
///
/// The log is divided into an active and a history segment. When the active
/// segment is full, it becomes the read-only history segment (purging
/// whatever history existed before) and a fresh active segment is created.
/// The log therefore retains at most twice the configured segment size in
/// records; readers holding offsets older than that observe
/// [`Error::OutOfRange`].
///
/// The log is a volatile cache of recent records: nothing is persisted, and
/// all state is lost when the process terminates.
///
/// # Thread Safety
///
/// `Log` is designed to be shared across tasks. All methods take `&self`;
/// writes are linearized by an exclusive lock and reads run concurrently
/// under a shared lock. A successful write is observable by every read that
/// starts after it returns.
///
/// # Cancellation
///
/// Every operation takes the caller's [`CancellationToken`]. An operation
/// invoked with an already-cancelled token fails with [`Error::Canceled`]
/// before any side effect; once a write has appended its record and
/// returned, it is committed regardless of later cancellation.
///
/// # Example
///
/// ```ignore
/// use bytes::Bytes;
/// use memlog::{Config, Log};
/// use tokio_util::sync::CancellationToken;
///
/// let cancel = CancellationToken::new();
/// let log = Log::new(Config::default())?;
///
/// let offset = log.write(&cancel, Bytes::from("Hello World")).await?;
/// let record = log.read(&cancel, offset).await?;
/// assert_eq!(record.data, Bytes::from("Hello World"));
/// ```
pub struct Log {
    conf: Config,
    clock: Arc<dyn Clock>,
    inner: RwLock<LogInner>,
}

impl Log {
    /// Creates an empty log with the given configuration and the real
    /// system clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when a configuration value fails
    /// validation.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty log with an injected clock.
    ///
    /// The clock supplies the `created_ms` timestamp stamped on every
    /// record. Tests typically inject a
    /// [`MockClock`](common::clock::MockClock); the sharded log shares one
    /// clock across all shards.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let active = Segment::new(config.start_offset, config.segment_size)?;
        let inner = LogInner {
            active,
            history: None,
            next_offset: config.start_offset,
        };

        Ok(Self {
            conf: config,
            clock,
            inner: RwLock::new(inner),
        })
    }

    /// Appends a record with the provided data and returns its offset.
    ///
    /// Payloads must be non-empty and no larger than the configured maximum
    /// record data size. When the active segment is full the log rotates:
    /// the active segment is sealed and becomes the new history segment
    /// (dropping the previous history), and the write lands in a fresh
    /// active segment.
    ///
    /// # Errors
    ///
    /// [`Error::Canceled`] when `cancel` is tripped before the record is
    /// appended, [`Error::RecordTooLarge`] and [`Error::EmptyData`] for
    /// invalid payloads. No offset is consumed on failure.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn write(&self, cancel: &CancellationToken, data: Bytes) -> Result<Offset> {
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        if data.len() > self.conf.max_record_data_size {
            return Err(Error::RecordTooLarge);
        }

        if data.is_empty() {
            return Err(Error::EmptyData);
        }

        let mut inner = self.inner.write().await;

        let record = Record {
            metadata: Header {
                offset: inner.next_offset,
                created_ms: self.clock.now_millis(),
            },
            data,
        };

        let mut attempt = inner.active.write(cancel, &record);
        if attempt == Err(WriteError::Full) {
            if let Err(err) = inner.rotate(self.conf.segment_size) {
                tracing::error!(%err, "segment rotation failed");
                panic!("segment rotation failed: {err}");
            }
            attempt = inner.active.write(cancel, &record);
        }

        match attempt {
            Ok(()) => {}
            Err(WriteError::Canceled) => return Err(Error::Canceled),
            // A sealed or full active segment at this point means the
            // rotation invariants are broken; continuing would corrupt
            // offset assignment.
            Err(err @ (WriteError::Sealed | WriteError::Full)) => {
                tracing::error!(?err, offset = record.metadata.offset, "segment write failed");
                panic!("segment write failed: {err:?}");
            }
        }

        inner.next_offset += 1;
        Ok(record.metadata.offset)
    }

    /// Reads the record at the specified offset.
    ///
    /// # Errors
    ///
    /// [`Error::FutureOffset`] when the offset has not been written yet,
    /// [`Error::OutOfRange`] when it is below the configured start offset
    /// or has been purged, [`Error::Canceled`] when `cancel` is tripped.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn read(&self, cancel: &CancellationToken, offset: Offset) -> Result<Record> {
        let inner = self.inner.read().await;
        self.read_at(&inner, cancel, offset)
    }

    /// Reads consecutive records into `batch`, starting at `offset`.
    ///
    /// At most `batch.len()` records are read, always filling from index 0
    /// in order. Reading stops at the end of the log, indicated by
    /// [`Error::FutureOffset`]. The returned count says how many leading
    /// entries of `batch` are valid; callers must expect partial results
    /// and must not read beyond it.
    ///
    /// An invalid or purged start offset yields `(0, Some(OutOfRange))`;
    /// cancellation mid-batch yields the records read so far alongside
    /// [`Error::Canceled`]. A completely filled batch carries no error.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn read_batch(
        &self,
        cancel: &CancellationToken,
        offset: Offset,
        batch: &mut [Record],
    ) -> (usize, Option<Error>) {
        let inner = self.inner.read().await;

        let mut offset = offset;
        for (i, slot) in batch.iter_mut().enumerate() {
            match self.read_at(&inner, cancel, offset) {
                Ok(record) => {
                    *slot = record;
                    offset += 1;
                }
                // invalid start offset or empty log
                Err(Error::OutOfRange) => return (0, Some(Error::OutOfRange)),
                // end of log or cancellation: return what we have
                Err(err) => return (i, Some(err)),
            }
        }

        (batch.len(), None)
    }

    /// Returns the earliest and latest available record offsets, or
    /// `(-1, -1)` when the log is empty.
    ///
    /// After one or more purges, earliest points at the oldest record still
    /// available, not the configured start offset. The values may have
    /// changed by the time the caller acts on them, e.g. due to concurrent
    /// writes.
    pub async fn range(&self) -> (Offset, Offset) {
        let inner = self.inner.read().await;
        inner.offset_range(self.conf.start_offset)
    }

    fn read_at(
        &self,
        inner: &LogInner,
        cancel: &CancellationToken,
        offset: Offset,
    ) -> Result<Record> {
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        if offset >= inner.next_offset {
            return Err(Error::FutureOffset);
        }

        if offset < self.conf.start_offset {
            return Err(Error::OutOfRange);
        }

        let segment = inner.locate(offset, self.conf.segment_size)?;
        let record = segment.read(cancel, offset)?;

        // Bytes payloads are immutable and refcounted, so cloning hands the
        // caller an independent record without copying the data.
        Ok(record.clone())
    }
}
