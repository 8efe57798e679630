//! Latency computation and history.
//!
//! ## Submodules
//!
//! - [`latency`]: per-interval latency from two cumulative snapshots
//! - [`series`]: bounded rolling history per command ([`SeriesMap`])
//! - [`projection`]: table and graph views of the history
//! - [`duration`]: interval parsing
//!
//! ## Data Flow
//!
//! ```text
//! Snapshot (cumulative counters)
//!        │
//!        ▼
//! compute_latencies(previous, current)
//!        │
//!        ▼
//! SeriesMap::append_sample()
//!        │
//!        ├──▶ table_projection()
//!        └──▶ graph_projection()
//! ```

pub mod duration;
pub mod latency;
pub mod projection;
pub mod series;

pub use latency::{compute_latencies, compute_latency, CounterSample, PreviousCounters};
pub use projection::{graph_projection, table_projection, GraphSeries, Palette, TableRow, PALETTE};
pub use series::{LatencyPoint, SeriesMap, DEFAULT_MAX_ITEMS_PER_SERIES};
