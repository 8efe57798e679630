//! Channel-based snapshot source.
//!
//! Serves whatever snapshot was last pushed into a tokio watch channel.
//! Useful for embedding, where some other task already talks to the store
//! and only needs to hand counters to the engine.

use async_trait::async_trait;
use tokio::sync::watch;

use super::{Snapshot, SnapshotSource, Target};
use crate::error::SourceError;

/// A snapshot source fed through a watch channel.
///
/// The channel holds `Option<Snapshot>`; `None` means nothing has been
/// published yet and is reported to the engine as "no data".
///
/// # Example
///
/// ```
/// use cmdstat_watch::{ChannelSource, CommandRow, Snapshot};
///
/// let (tx, source) = ChannelSource::create("embedded");
/// tx.send(Some(Snapshot::new(vec![CommandRow::new("get", 10, 2000)]))).unwrap();
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: watch::Receiver<Option<Snapshot>>,
    description: String,
}

impl ChannelSource {
    /// Create a new channel source from an existing receiver.
    pub fn new(receiver: watch::Receiver<Option<Snapshot>>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
        }
    }

    /// Create a channel pair. The sender pushes snapshots, the source serves them.
    pub fn create(source_description: &str) -> (watch::Sender<Option<Snapshot>>, Self) {
        let (tx, rx) = watch::channel(None);
        (tx, Self::new(rx, source_description))
    }
}

#[async_trait]
impl SnapshotSource for ChannelSource {
    async fn query(&self, _target: &Target) -> Result<Option<Snapshot>, SourceError> {
        Ok(self.receiver.borrow().clone())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
