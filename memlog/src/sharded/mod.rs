//! Key-sharded composition of independent logs.
//!
//! A sharded [`Log`] routes keyed reads and writes to one of N independent
//! [`memlog::Log`](crate::Log)s through a pluggable [`Sharder`]. Each shard
//! keeps its own offset space: offsets returned by [`Log::write`] are local
//! to the shard the key routed to and are not globally unique. The sharded
//! surface is deliberately narrow — keyed read and write only; consumers
//! that want per-key streams maintain per-key offsets themselves.

mod sharder;

pub use sharder::{HashSharder, KeySharder, Sharder};

use std::sync::Arc;

use bytes::Bytes;
use common::clock::{Clock, SystemClock};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::model::{Offset, Record};

/// Number of shards unless configured otherwise.
pub const DEFAULT_SHARDS: u32 = 1000;

/// Configuration for creating a sharded [`Log`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of independent shards. Must be at least 2; a sharded log
    /// with a single shard is a plain log.
    pub shards: u32,

    /// Configuration applied to every shard.
    pub log: crate::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            log: crate::Config::default(),
        }
    }
}

impl Config {
    fn validate(&self) -> Result<()> {
        if self.shards < 2 {
            return Err(Error::InvalidConfig(
                "number of shards must be greater than 1".into(),
            ));
        }
        self.log.validate()
    }
}

/// A sharded log routing keyed reads and writes to independent shards.
///
/// All shards are created with identical parameters and share one clock.
/// Each shard is governed by its own lock, so operations on different
/// shards never contend; no cross-shard ordering is guaranteed.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use bytes::Bytes;
/// use memlog::sharded::{Config, KeySharder, Log};
/// use tokio_util::sync::CancellationToken;
///
/// let cancel = CancellationToken::new();
/// let sharder = Arc::new(KeySharder::new(["users", "groups"]));
/// let log = Log::with_sharder(Config { shards: 2, ..Config::default() }, sharder)?;
///
/// let offset = log.write(&cancel, b"users", Bytes::from("alice")).await?;
/// let record = log.read(&cancel, b"users", offset).await?;
/// ```
pub struct Log {
    sharder: Arc<dyn Sharder>,
    shards: Vec<crate::Log>,
}

impl Log {
    /// Creates a sharded log with the default FNV-1a hash sharder.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_sharder(config, Arc::new(HashSharder))
    }

    /// Creates a sharded log with a custom sharding strategy.
    pub fn with_sharder(config: Config, sharder: Arc<dyn Sharder>) -> Result<Self> {
        Self::with_clock(config, sharder, Arc::new(SystemClock))
    }

    /// Creates a sharded log with a custom sharder and clock.
    pub fn with_clock(
        config: Config,
        sharder: Arc<dyn Sharder>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let shards = (0..config.shards)
            .map(|_| crate::Log::with_clock(config.log.clone(), Arc::clone(&clock)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { sharder, shards })
    }

    /// Writes data to the shard selected for `key` and returns the write
    /// offset within that shard's offset space.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn write(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        data: Bytes,
    ) -> Result<Offset> {
        let shard = self.route(key)?;
        self.shards[shard].write(cancel, data).await
    }

    /// Reads the record at `offset` from the shard selected for `key`. The
    /// offset is interpreted in that shard's offset space.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn read(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        offset: Offset,
    ) -> Result<Record> {
        let shard = self.route(key)?;
        self.shards[shard].read(cancel, offset).await
    }

    fn route(&self, key: &[u8]) -> Result<usize> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        let shard = self.sharder.shard(key, self.shards.len() as u32)?;
        Ok(shard as usize)
    }
}
