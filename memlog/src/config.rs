//! Configuration options for the log.
//!
//! This module defines the configuration struct that controls log creation.
//! The option set is closed: these values plus the clock passed to
//! [`Log::with_clock`](crate::Log::with_clock) are the entire construction
//! surface.

use crate::error::{Error, Result};
use crate::model::Offset;

/// Start offset assigned to the first record unless configured otherwise.
pub const DEFAULT_START_OFFSET: Offset = 0;

/// Records per segment unless configured otherwise.
pub const DEFAULT_SEGMENT_SIZE: usize = 1024;

/// Maximum record payload bytes unless configured otherwise.
pub const DEFAULT_MAX_RECORD_DATA_SIZE: usize = 1024 << 10; // 1 MiB

/// Configuration for creating a [`Log`](crate::Log).
///
/// Every value is validated when the log is created; invalid values fail
/// construction with [`Error::InvalidConfig`].
///
/// # Example
///
/// ```
/// use memlog::Config;
///
/// let config = Config {
///     start_offset: 10,
///     segment_size: 512,
///     ..Config::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Offset assigned to the first record. Must not be negative.
    pub start_offset: Offset,

    /// Capacity of each segment in records. Must be greater than zero.
    ///
    /// The log retains at most twice this many records at any time (active
    /// plus history segment).
    pub segment_size: usize,

    /// Maximum payload size per record in bytes. Must be greater than zero.
    pub max_record_data_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_offset: DEFAULT_START_OFFSET,
            segment_size: DEFAULT_SEGMENT_SIZE,
            max_record_data_size: DEFAULT_MAX_RECORD_DATA_SIZE,
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.start_offset < 0 {
            return Err(Error::InvalidConfig(
                "start offset must not be negative".into(),
            ));
        }
        if self.segment_size == 0 {
            return Err(Error::InvalidConfig(
                "segment size must be greater than 0".into(),
            ));
        }
        if self.max_record_data_size == 0 {
            return Err(Error::InvalidConfig(
                "max record data size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
