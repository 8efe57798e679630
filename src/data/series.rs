//! Rolling per-command latency history.

use std::collections::hash_map;
use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::source::Snapshot;

/// Default number of points kept per command.
pub const DEFAULT_MAX_ITEMS_PER_SERIES: usize = 300;

/// One latency observation. `time` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyPoint {
    pub time: u64,
    pub value: f64,
}

/// Bounded latency history for every command seen so far.
///
/// Each series is chronological and holds at most `limit` points; once
/// full, appending drops the oldest point. Commands that stop appearing in
/// snapshots keep their history untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SeriesMap {
    series: HashMap<String, VecDeque<LatencyPoint>>,
}

impl SeriesMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick's latencies into the history and return the result.
    ///
    /// `latencies` is aligned with `snapshot.rows`; a `None` (undefined
    /// first observation) is stored as `0.0`. Rows without a matching
    /// latency are left out.
    pub fn append_sample(
        mut self,
        snapshot: &Snapshot,
        latencies: &[Option<f64>],
        time: u64,
        limit: usize,
    ) -> Self {
        let limit = limit.max(1);

        for (row, latency) in snapshot.iter().zip(latencies) {
            let value = latency.unwrap_or(0.0);
            let points = self.series.entry(row.command.clone()).or_default();

            // A wall clock step backwards must not break chronological order
            let time = points.back().map_or(time, |last| time.max(last.time));
            points.push_back(LatencyPoint { time, value });
            while points.len() > limit {
                points.pop_front();
            }
        }

        if latencies.len() != snapshot.len() {
            tracing::debug!(
                rows = snapshot.len(),
                latencies = latencies.len(),
                "latency count does not match snapshot rows"
            );
        }

        self
    }

    /// Shrink every series to its newest `limit` points.
    pub fn truncate(&mut self, limit: usize) {
        let limit = limit.max(1);
        for points in self.series.values_mut() {
            let excess = points.len().saturating_sub(limit);
            points.drain(..excess);
        }
    }

    /// History for one command, oldest first.
    pub fn get(&self, command: &str) -> Option<&VecDeque<LatencyPoint>> {
        self.series.get(command)
    }

    /// Most recent point for one command.
    pub fn latest(&self, command: &str) -> Option<&LatencyPoint> {
        self.series.get(command).and_then(|points| points.back())
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, VecDeque<LatencyPoint>> {
        self.series.iter()
    }

    /// Number of commands tracked.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
