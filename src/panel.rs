//! Presentation adapter for the latency engine.
//!
//! A [`LatencyPanel`] follows an engine's published state and turns each
//! update into a [`Frame`] for the active view. It owns the only
//! presentation state there is: the view mode, the hide-zero filter and
//! the colour palette. It never touches the engine's history.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::EngineConfig;
use crate::data::{graph_projection, table_projection, GraphSeries, Palette, TableRow};
use crate::poller::{LatencyEngine, Published};

/// How latency is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Latest latency per command, joined onto the raw counters.
    #[default]
    Table,
    /// Full rolling history per command.
    Graph,
}

impl ViewMode {
    /// Cycle to the other view.
    pub fn next(self) -> Self {
        match self {
            ViewMode::Table => ViewMode::Graph,
            ViewMode::Graph => ViewMode::Table,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Table => "Table",
            ViewMode::Graph => "Graph",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(ViewMode::Table),
            "graph" => Ok(ViewMode::Graph),
            other => Err(format!("unknown view mode: {}", other)),
        }
    }
}

/// One presentation of the engine state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum Frame {
    Table { updated_ms: u64, rows: Vec<TableRow> },
    Graph { updated_ms: u64, series: Vec<GraphSeries> },
}

impl Frame {
    pub fn updated_ms(&self) -> u64 {
        match self {
            Frame::Table { updated_ms, .. } | Frame::Graph { updated_ms, .. } => *updated_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Frame::Table { rows, .. } => rows.is_empty(),
            Frame::Graph { series, .. } => series.is_empty(),
        }
    }
}

/// Consumer of an engine's published updates.
pub struct LatencyPanel {
    pub view_mode: ViewMode,
    pub hide_zero: bool,
    palette: Palette,
    updates: watch::Receiver<Published>,
}

impl LatencyPanel {
    /// Attach a panel to an engine, taking view options from `config`.
    pub fn new(engine: &LatencyEngine, config: &EngineConfig) -> Self {
        Self::from_receiver(engine.subscribe(), config.view_mode, config.hide_zero)
    }

    pub fn from_receiver(
        updates: watch::Receiver<Published>,
        view_mode: ViewMode,
        hide_zero: bool,
    ) -> Self {
        Self {
            view_mode,
            hide_zero,
            palette: Palette::new(),
            updates,
        }
    }

    /// Switch between table and graph.
    pub fn toggle_view(&mut self) {
        self.view_mode = self.view_mode.next();
    }

    /// Project a published state for the current view.
    pub fn frame(&mut self, state: &Published) -> Frame {
        // Colours follow snapshot row order, whichever view is active
        self.palette.observe(&state.snapshot);

        match self.view_mode {
            ViewMode::Table => Frame::Table {
                updated_ms: state.updated_ms,
                rows: table_projection(&state.snapshot, &state.series),
            },
            ViewMode::Graph => Frame::Graph {
                updated_ms: state.updated_ms,
                series: graph_projection(&state.series, self.hide_zero, &mut self.palette),
            },
        }
    }

    /// Frame for the most recent state, whether or not it is new.
    pub fn current_frame(&mut self) -> Frame {
        let state = self.updates.borrow_and_update().clone();
        self.frame(&state)
    }

    /// Wait for the next update and project it.
    ///
    /// Returns `None` once the engine has been dropped.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.updates.changed().await.ok()?;
        Some(self.current_frame())
    }
}

impl fmt::Debug for LatencyPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyPanel")
            .field("view_mode", &self.view_mode)
            .field("hide_zero", &self.hide_zero)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::source::{ChannelSource, CommandRow, Snapshot, Target};

    fn engine_with(rows: Vec<CommandRow>) -> (watch::Sender<Option<Snapshot>>, LatencyEngine) {
        let (tx, source) = ChannelSource::create("test");
        let engine = LatencyEngine::new(Arc::new(source), EngineConfig::default()).unwrap();
        engine.set_target(Some(Target::new("test")));
        tx.send(Some(Snapshot::new(rows))).unwrap();
        (tx, engine)
    }

    #[test]
    fn view_mode_cycles_and_parses() {
        assert_eq!(ViewMode::Table.next(), ViewMode::Graph);
        assert_eq!(ViewMode::Graph.next(), ViewMode::Table);
        assert_eq!("Graph".parse::<ViewMode>().unwrap(), ViewMode::Graph);
        assert_eq!(" table ".parse::<ViewMode>().unwrap(), ViewMode::Table);
        assert!("pie".parse::<ViewMode>().is_err());
        assert_eq!(ViewMode::Graph.to_string(), "Graph");
    }

    #[tokio::test]
    async fn table_frame_after_tick() {
        let (_tx, engine) = engine_with(vec![
            CommandRow::new("get", 10, 2000),
            CommandRow::new("set", 0, 0),
        ]);
        let mut panel = LatencyPanel::new(&engine, &EngineConfig::default());

        engine.tick().await;
        let frame = panel.next_frame().await.unwrap();

        let Frame::Table { rows, .. } = frame else {
            panic!("expected table frame");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].latency, 200.0);
        assert_eq!(rows[1].latency, 0.0);
    }

    #[tokio::test]
    async fn graph_frame_respects_hide_zero() {
        let (_tx, engine) = engine_with(vec![
            CommandRow::new("get", 10, 2000),
            CommandRow::new("set", 0, 0),
        ]);
        let config = EngineConfig {
            view_mode: ViewMode::Graph,
            hide_zero: true,
            ..EngineConfig::default()
        };
        let mut panel = LatencyPanel::new(&engine, &config);

        engine.tick().await;
        let Some(Frame::Graph { series, .. }) = panel.next_frame().await else {
            panic!("expected graph frame");
        };
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].command, "get");
        assert_eq!(series[0].color, crate::data::PALETTE[0]);
    }

    #[tokio::test]
    async fn toggle_switches_projection() {
        let (_tx, engine) = engine_with(vec![CommandRow::new("get", 10, 2000)]);
        let mut panel = LatencyPanel::new(&engine, &EngineConfig::default());
        engine.tick().await;

        assert!(matches!(panel.current_frame(), Frame::Table { .. }));
        panel.toggle_view();
        assert!(matches!(panel.current_frame(), Frame::Graph { .. }));
    }

    #[tokio::test]
    async fn empty_state_gives_empty_frame() {
        let (_tx, engine) = engine_with(vec![]);
        let mut panel = LatencyPanel::new(&engine, &EngineConfig::default());
        let frame = panel.current_frame();
        assert!(frame.is_empty());
        assert_eq!(frame.updated_ms(), 0);
    }

    #[tokio::test]
    async fn next_frame_ends_when_engine_dropped() {
        let (_tx, engine) = engine_with(vec![]);
        let mut panel = LatencyPanel::new(&engine, &EngineConfig::default());
        drop(engine);
        assert!(panel.next_frame().await.is_none());
    }

    #[test]
    fn frame_serializes_with_view_tag() {
        let frame = Frame::Table {
            updated_ms: 5,
            rows: vec![],
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["view"], "table");
        assert_eq!(json["updated_ms"], 5);
    }
}
