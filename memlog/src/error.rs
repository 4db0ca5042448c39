//! Error types for log operations.
//!
//! Boundary errors are sentinels the caller is expected to branch on:
//! [`Error::FutureOffset`] signals the tail of the log and
//! [`Error::OutOfRange`] a purged or never-written offset. They are returned
//! untouched through the call stack so equality comparison works at any
//! layer.

use thiserror::Error;

/// Convenience alias for `Result<T, Error>` used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by log, stream, and sharded-log operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Record data exceeds the configured maximum payload size.
    #[error("record data too large")]
    RecordTooLarge,

    /// A write was attempted with an empty payload.
    #[error("no data provided")]
    EmptyData,

    /// The requested offset has not been written yet.
    #[error("future offset")]
    FutureOffset,

    /// The requested offset never existed for this log configuration or has
    /// been purged from history.
    #[error("offset out of range")]
    OutOfRange,

    /// The caller's cancellation scope was cancelled.
    #[error("operation canceled")]
    Canceled,

    /// Push-style streaming only: the consumer did not drain its buffer in
    /// time and the stream was terminated to protect the producer.
    #[error("slow reader")]
    SlowReader,

    /// No usable shard key was provided.
    #[error("invalid key")]
    InvalidKey,

    /// The key sharder has no shard registered for the given key.
    #[error("shard not found")]
    ShardNotFound,

    /// The key sharder was asked to route across fewer shards than it has
    /// registered keys.
    #[error("number of keys greater than available shards")]
    KeyCountExceedsShards,

    /// A configuration value failed validation at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
