//! Snapshot source abstraction.
//!
//! A snapshot source answers one question: "what are the cumulative
//! per-command counters right now?". The latency engine asks it once per
//! tick and treats it as an opaque, possibly failing, asynchronous service.

mod channel;
mod file;
mod resp;
mod snapshot;
mod target;

pub use channel::ChannelSource;
pub use file::FileSource;
pub use resp::RespSource;
pub use snapshot::{CommandRow, Snapshot};
pub use target::{ResolvedTarget, Target, DEFAULT_COMMAND, DEFAULT_KIND, DEFAULT_SECTION};

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::SourceError;

/// Trait for querying per-command counter snapshots.
///
/// # Example
///
/// ```
/// use cmdstat_watch::{ChannelSource, SnapshotSource, Target};
///
/// # tokio_test::block_on(async {
/// let (_tx, source) = ChannelSource::create("test");
/// let result = source.query(&Target::new("test")).await.unwrap();
/// assert!(result.is_none());
/// # });
/// ```
#[async_trait]
pub trait SnapshotSource: Send + Sync + Debug {
    /// Query one snapshot for the given target.
    ///
    /// Returns `Ok(None)` when there is nothing to report yet (nothing
    /// published, or the store returned no rows).
    async fn query(&self, target: &Target) -> Result<Option<Snapshot>, SourceError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
