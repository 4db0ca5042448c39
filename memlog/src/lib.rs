//! An append-only, bounded, in-memory log.
//!
//! memlog is a streaming buffer between a durable upstream data source and
//! one or more in-process consumers that read at their own pace. It exposes
//! monotonic integer offsets, immutable records, bounded retention via
//! segment rotation, concurrent random-access reads, and long-lived
//! order-preserving streaming.
//!
//! # Architecture
//!
//! A log holds two fixed-capacity segments: the writable *active* segment
//! and a sealed, read-only *history* segment. When the active segment fills
//! up it is sealed and becomes the new history — purging whatever history
//! existed before — and a fresh active segment takes its place. Memory is
//! therefore bounded at twice the configured segment size in records;
//! readers that fall behind the retained window observe
//! [`Error::OutOfRange`] and resume from [`Log::range`].
//!
//! The log is a volatile cache of recent records. Nothing is persisted; on
//! process termination all state is lost by design.
//!
//! # Key Concepts
//!
//! - **[`Log`]**: the single-writer-locked, concurrently readable log with
//!   `write`, `read`, `read_batch`, and `range`.
//! - **[`Offset`]**: dense, monotonically assigned record position; `-1`
//!   denotes "no valid offset".
//! - **[`Stream`]**: a pull-style iterator following the log tail, with a
//!   push-style [`Subscription`] alternative for channel-based consumers.
//! - **[`sharded::Log`]**: keyed fan-out across N independent logs through
//!   a pluggable [`sharded::Sharder`].
//!
//! # Example
//!
//! ```ignore
//! use bytes::Bytes;
//! use memlog::{Config, Log};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let log = Log::new(Config::default())?;
//!
//! let offset = log.write(&cancel, Bytes::from("Hello World")).await?;
//! assert_eq!(offset, 0);
//!
//! let record = log.read(&cancel, offset).await?;
//! assert_eq!(record.data, Bytes::from("Hello World"));
//!
//! let mut stream = log.stream(cancel.clone(), 0);
//! while let Some(record) = stream.next().await {
//!     println!("offset={} data={:?}", record.metadata.offset, record.data);
//! }
//! ```

mod config;
mod error;
mod log;
mod model;
mod segment;
pub mod sharded;
mod stream;

pub use config::{
    Config, DEFAULT_MAX_RECORD_DATA_SIZE, DEFAULT_SEGMENT_SIZE, DEFAULT_START_OFFSET,
};
pub use error::{Error, Result};
pub use log::Log;
pub use model::{Header, Offset, Record};
pub use stream::{Stream, Subscription};
