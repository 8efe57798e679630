//! # cmdstat-watch
//!
//! Per-command latency tracking for a key-value store, built from the
//! cumulative counters of its `INFO commandstats` reply.
//!
//! The store only reports totals (calls, microseconds) since startup. This
//! crate polls those totals on a timer, differences consecutive snapshots
//! into per-interval latencies, and keeps a bounded rolling history per
//! command that table and graph views can be projected from.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        LatencyEngine                         │
//! │  ┌─────────┐    ┌────────────────┐    ┌──────────────────┐   │
//! │  │ source  │───▶│ data::latency  │───▶│  data::series    │   │
//! │  │ (query) │    │ (delta calc)   │    │  (SeriesMap)     │   │
//! │  └─────────┘    └────────────────┘    └────────┬─────────┘   │
//! │       ▲                                        │ publish     │
//! │       │ timer tick                             ▼             │
//! └───────┼────────────────────────────────────────┼─────────────┘
//!         │                                        ▼
//!   FileSource | ChannelSource | RespSource   LatencyPanel
//!                                             (table / graph frames)
//! ```
//!
//! - **[`source`]**: the [`SnapshotSource`] trait and its implementations
//! - **[`data`]**: delta calculation, the rolling [`SeriesMap`], projections
//! - **[`poller`]**: the [`LatencyEngine`] scheduling loop
//! - **[`panel`]**: the [`LatencyPanel`] presentation adapter
//! - **[`config`]**: layered [`Settings`]
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Poll a live server once a second
//! cmdstat-watch --connect 127.0.0.1:6379
//!
//! # Graph view from a counters file, every 500ms
//! cmdstat-watch --file commandstats.txt --interval 500ms --view graph
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use cmdstat_watch::{
//!     ChannelSource, CommandRow, EngineConfig, LatencyEngine, Snapshot, Target, TickOutcome,
//! };
//!
//! # tokio_test::block_on(async {
//! let (tx, source) = ChannelSource::create("embedded");
//! let engine = LatencyEngine::new(Arc::new(source), EngineConfig::default()).unwrap();
//! engine.set_target(Some(Target::new("embedded")));
//!
//! tx.send(Some(Snapshot::new(vec![CommandRow::new("get", 10, 2000)]))).unwrap();
//! assert_eq!(engine.tick().await, TickOutcome::Published);
//!
//! tx.send(Some(Snapshot::new(vec![CommandRow::new("get", 20, 3000)]))).unwrap();
//! engine.tick().await;
//!
//! let series = engine.latest().series;
//! assert_eq!(series.latest("get").unwrap().value, 100.0);
//! # });
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod panel;
pub mod poller;
pub mod source;

pub use crate::config::{EngineConfig, Settings};
pub use data::{LatencyPoint, SeriesMap};
pub use error::{ConfigError, SourceError};
pub use panel::{Frame, LatencyPanel, ViewMode};
pub use poller::{EngineState, LatencyEngine, Published, TickOutcome};
pub use source::{
    ChannelSource, CommandRow, FileSource, RespSource, Snapshot, SnapshotSource, Target,
};
