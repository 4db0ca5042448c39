//! Core data types for the log.
//!
//! This module defines the fundamental data structures used throughout the
//! log API: offsets addressing records, and the records themselves.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Monotonically increasing position of a record in a log.
///
/// Offsets are dense: once a log has assigned offsets `s..s+n`, every value
/// in that range has existed as a record, though older ones may have been
/// purged from memory. The value `-1` denotes "no valid offset" (empty log,
/// invalid result). Negative offsets supplied by callers are rejected with
/// [`Error::OutOfRange`](crate::Error::OutOfRange).
pub type Offset = i64;

/// Metadata assigned to a record at write time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// The record offset relative to the log start.
    pub offset: Offset,

    /// UTC milliseconds since the Unix epoch when the record was written.
    ///
    /// Zero marks an invalid (empty) record, returned alongside errors.
    pub created_ms: i64,
}

/// An immutable entry in the log.
///
/// The payload is an opaque byte blob; the log never interprets or validates
/// it. Payloads are held as [`Bytes`], which is immutable and cheap to
/// clone, so records handed out by the log can be shared freely without
/// aliasing the log's internal state: no caller can mutate what a later read
/// observes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Offset and creation time assigned at write time.
    pub metadata: Header,

    /// The record payload.
    pub data: Bytes,
}
