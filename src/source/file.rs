//! File-based snapshot source.
//!
//! Reads a counters file on every query. The file may hold either the raw
//! `INFO commandstats` text or the JSON snapshot format.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{Snapshot, SnapshotSource, Target};
use crate::error::SourceError;

/// A snapshot source that reads counters from a file.
///
/// Unlike a change-triggered watcher, the file is read on every query:
/// an unchanged file is a valid observation (no new calls) and must still
/// produce a tick.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    async fn query(&self, _target: &Target) -> Result<Option<Snapshot>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let snapshot = Snapshot::parse(&content)?;
        Ok((!snapshot.is_empty()).then_some(snapshot))
    }

    fn description(&self) -> &str {
        &self.description
    }
}
