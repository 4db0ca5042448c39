//! Order-preserving streaming over a log's records.
//!
//! Two shapes are provided:
//!
//! - [`Stream`], a pull-style iterator returned by [`Log::stream`]. No
//!   background task, no buffering: the consumer drives the pace and the
//!   iterator terminates deterministically with the consumer's last call.
//! - [`Subscription`], a push-style stream returned by [`Log::subscribe`].
//!   A producer task polls the log and delivers records through a bounded
//!   channel; a consumer that stops draining is cut off with
//!   [`Error::SlowReader`] to protect the producer from unbounded
//!   buffering.
//!
//! Both follow the log tail across purges only as long as they stay within
//! the retained window: a stream positioned on a purged offset stops with
//! [`Error::OutOfRange`] instead of silently skipping ahead, preserving the
//! order-and-completeness contract. The consumer decides how to resume,
//! typically by consulting [`Log::range`] and restarting at a newer offset.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::log::Log;
use crate::model::{Offset, Record};

/// Backoff between polls while waiting for a future offset to be written.
const STREAM_BACKOFF_INTERVAL: Duration = Duration::from_millis(10);

impl Log {
    /// Returns a stream iterator over this log's records, starting at the
    /// given offset. If the start offset is in the future, the stream polls
    /// until that offset is written.
    ///
    /// The iterator is bound to `cancel`: tripping the token stops the
    /// stream with [`Error::Canceled`], including while it is blocked
    /// waiting for new records. The iterator must not be shared across
    /// concurrent consumers.
    pub fn stream(&self, cancel: CancellationToken, start: Offset) -> Stream<'_> {
        Stream {
            log: self,
            cancel,
            position: start,
            done: false,
            err: None,
        }
    }

    /// Spawns a producer task delivering this log's records through a
    /// bounded channel, starting at the given offset.
    ///
    /// The log handle is shared with the producer task; callers keeping
    /// their own handle clone the [`Arc`] first. `buffer` is the record
    /// channel capacity (values below 1 are clamped to 1). If the buffer is
    /// full when the next record is ready, the stream terminates with
    /// [`Error::SlowReader`]. The producer task terminates on cancellation,
    /// on any unrecoverable read error, or when the [`Subscription`] is
    /// dropped; it never outlives its stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(
        self: Arc<Self>,
        cancel: CancellationToken,
        start: Offset,
        buffer: usize,
    ) -> Subscription {
        let (records_tx, records_rx) = mpsc::channel(buffer.max(1));
        let (done_tx, done_rx) = oneshot::channel();
        let log = self;

        tokio::spawn(async move {
            let mut position = start;
            let reason = loop {
                if cancel.is_cancelled() {
                    break Error::Canceled;
                }

                match log.read(&cancel, position).await {
                    Ok(record) => match records_tx.try_send(record) {
                        Ok(()) => position += 1,
                        Err(mpsc::error::TrySendError::Full(_)) => break Error::SlowReader,
                        // consumer dropped the subscription; nothing left
                        // to report to
                        Err(mpsc::error::TrySendError::Closed(_)) => return,
                    },
                    Err(Error::FutureOffset) => {
                        // cancellation wins over consumer teardown when
                        // both are observed at the same poll
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break Error::Canceled,
                            _ = records_tx.closed() => return,
                            _ = tokio::time::sleep(STREAM_BACKOFF_INTERVAL) => {}
                        }
                    }
                    Err(err) => break err,
                }
            };

            let _ = done_tx.send(reason);
            // records_tx drops here, closing the record channel exactly once
        });

        Subscription {
            records: records_rx,
            done: done_rx,
        }
    }
}

/// A pull-style iterator streaming records in order from a log.
///
/// Created with [`Log::stream`]. The iterator is terminal: once it stops,
/// every subsequent [`Stream::next`] call returns `None` and
/// [`Stream::err`] reports the stop reason.
pub struct Stream<'a> {
    log: &'a Log,
    cancel: CancellationToken,
    position: Offset,
    done: bool,
    err: Option<Error>,
}

impl Stream<'_> {
    /// Returns the next record, waiting until it becomes available.
    ///
    /// `None` means the iterator has stopped; consult [`Stream::err`] for
    /// the reason. A stream positioned on an offset that was purged stops
    /// with [`Error::OutOfRange`] rather than skipping records.
    pub async fn next(&mut self) -> Option<Record> {
        loop {
            if self.done {
                return None;
            }

            if self.cancel.is_cancelled() {
                return self.stop(Error::Canceled);
            }

            match self.log.read(&self.cancel, self.position).await {
                Ok(record) => {
                    self.position = record.metadata.offset + 1;
                    return Some(record);
                }
                Err(Error::FutureOffset) => {
                    // back off and continue polling; the wait itself stays
                    // cancellable
                    tokio::select! {
                        _ = self.cancel.cancelled() => return self.stop(Error::Canceled),
                        _ = tokio::time::sleep(STREAM_BACKOFF_INTERVAL) => {}
                    }
                }
                Err(err) => return self.stop(err),
            }
        }
    }

    /// The reason the iterator stopped, or `None` while it is running.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn stop(&mut self, err: Error) -> Option<Record> {
        self.err = Some(err);
        self.done = true;
        None
    }
}

/// A push-style stream of records delivered through a bounded channel.
///
/// Created with [`Log::subscribe`]. Records arrive in offset order via
/// [`Subscription::recv`]; when the stream terminates the channel closes
/// and [`Subscription::err`] yields the reason. Awaiting the reason
/// synchronizes with producer termination.
pub struct Subscription {
    records: mpsc::Receiver<Record>,
    done: oneshot::Receiver<Error>,
}

impl Subscription {
    /// Receives the next record. `None` means the stream terminated;
    /// consult [`Subscription::err`] for the reason.
    pub async fn recv(&mut self) -> Option<Record> {
        self.records.recv().await
    }

    /// Waits for producer termination and returns the stop reason.
    ///
    /// Awaiting the reason synchronizes with the producer: the call blocks
    /// until the stream has terminated through cancellation, an
    /// unrecoverable read error, or a slow consumer. `None` is only
    /// possible when the producer stopped because the consumer dropped the
    /// subscription's receiving half.
    pub async fn err(self) -> Option<Error> {
        self.done.await.ok()
    }
}
