//! Read-only projections of engine state for the table and graph views.

use std::collections::HashMap;

use serde::Serialize;

use super::series::SeriesMap;
use crate::source::Snapshot;

/// Colours handed out to commands in first-seen order, then reused cyclically.
pub const PALETTE: [&str; 10] = [
    "#7EB26D", "#EAB839", "#6ED0E0", "#EF843C", "#E24D42", "#1F78C1", "#BA43A9", "#705DA0",
    "#508642", "#CCA300",
];

/// One row of the table view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub command: String,
    pub calls: u64,
    pub duration: u64,
    /// Most recent latency, or 0 if the command has no history.
    pub latency: f64,
}

/// One line of the graph view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSeries {
    pub command: String,
    pub color: &'static str,
    /// `(time_ms, latency)` pairs, oldest first.
    pub points: Vec<(u64, f64)>,
}

/// Latest snapshot rows joined with each command's most recent latency.
pub fn table_projection(snapshot: &Snapshot, series: &SeriesMap) -> Vec<TableRow> {
    snapshot
        .iter()
        .map(|row| TableRow {
            command: row.command.clone(),
            calls: row.calls,
            duration: row.duration,
            latency: series.latest(&row.command).map_or(0.0, |p| p.value),
        })
        .collect()
}

/// Every non-empty series as a plottable line, in palette order.
///
/// With `hide_zero`, series whose every value is exactly zero are left out.
/// They still receive a colour so it does not shift once they show up.
pub fn graph_projection(series: &SeriesMap, hide_zero: bool, palette: &mut Palette) -> Vec<GraphSeries> {
    let mut unseen: Vec<&str> = series
        .commands()
        .filter(|c| palette.rank(c).is_none())
        .collect();
    unseen.sort_unstable();
    for command in unseen {
        palette.assign(command);
    }

    let mut lines: Vec<(usize, GraphSeries)> = series
        .iter()
        .filter(|(_, points)| !points.is_empty())
        .filter(|(_, points)| !(hide_zero && points.iter().all(|p| p.value == 0.0)))
        .filter_map(|(command, points)| {
            let rank = palette.rank(command)?;
            Some((
                rank,
                GraphSeries {
                    command: command.clone(),
                    color: PALETTE[rank % PALETTE.len()],
                    points: points.iter().map(|p| (p.time, p.value)).collect(),
                },
            ))
        })
        .collect();

    lines.sort_by_key(|(rank, _)| *rank);
    lines.into_iter().map(|(_, line)| line).collect()
}

/// Stable colour assignment by first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    ranks: HashMap<String, usize>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every command of a snapshot, in row order.
    pub fn observe(&mut self, snapshot: &Snapshot) {
        for row in snapshot.iter() {
            self.assign(&row.command);
        }
    }

    /// Colour for `command`, assigning the next one if it is new.
    pub fn assign(&mut self, command: &str) -> &'static str {
        let next = self.ranks.len();
        let rank = *self.ranks.entry(command.to_string()).or_insert(next);
        PALETTE[rank % PALETTE.len()]
    }

    fn rank(&self, command: &str) -> Option<usize> {
        self.ranks.get(command).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CommandRow;

    fn snapshot(rows: &[(&str, u64, u64)]) -> Snapshot {
        Snapshot::new(
            rows.iter()
                .map(|(c, calls, duration)| CommandRow::new(*c, *calls, *duration))
                .collect(),
        )
    }

    #[test]
    fn table_uses_latest_value_and_defaults_to_zero() {
        let snap = snapshot(&[("get", 10, 2000), ("set", 1, 5)]);
        let series = SeriesMap::new()
            .append_sample(&snapshot(&[("get", 0, 0)]), &[Some(200.0)], 1, 10)
            .append_sample(&snapshot(&[("get", 0, 0)]), &[Some(100.0)], 2, 10);

        let rows = table_projection(&snap, &series);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].command, "get");
        assert_eq!(rows[0].latency, 100.0);
        assert_eq!(rows[0].calls, 10);
        assert_eq!(rows[1].command, "set");
        assert_eq!(rows[1].latency, 0.0);
    }

    #[test]
    fn graph_orders_by_first_seen() {
        let mut palette = Palette::new();
        palette.observe(&snapshot(&[("set", 0, 0), ("get", 0, 0)]));

        let series = SeriesMap::new().append_sample(
            &snapshot(&[("get", 0, 0), ("set", 0, 0)]),
            &[Some(1.0), Some(2.0)],
            1,
            10,
        );

        let lines = graph_projection(&series, false, &mut palette);
        let names: Vec<&str> = lines.iter().map(|l| l.command.as_str()).collect();
        assert_eq!(names, vec!["set", "get"]);
        assert_eq!(lines[0].color, PALETTE[0]);
        assert_eq!(lines[1].color, PALETTE[1]);
        assert_eq!(lines[1].points, vec![(1, 1.0)]);
    }

    #[test]
    fn graph_hide_zero_filters_all_zero_series() {
        let mut palette = Palette::new();
        let snap = snapshot(&[("get", 0, 0), ("ping", 0, 0)]);
        let series = SeriesMap::new()
            .append_sample(&snap, &[Some(0.0), Some(0.0)], 1, 10)
            .append_sample(&snap, &[Some(5.0), Some(0.0)], 2, 10);

        let shown = graph_projection(&series, true, &mut palette);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].command, "get");

        let all = graph_projection(&series, false, &mut palette);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn hidden_series_keep_their_colour() {
        let mut palette = Palette::new();
        let snap = snapshot(&[("a", 0, 0), ("b", 0, 0)]);
        let series = SeriesMap::new().append_sample(&snap, &[Some(0.0), Some(1.0)], 1, 10);

        let shown = graph_projection(&series, true, &mut palette);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].color, PALETTE[1]);

        // "a" was ranked first even though it was hidden
        assert_eq!(palette.assign("c"), PALETTE[2]);
        assert_eq!(palette.assign("a"), PALETTE[0]);
    }

    #[test]
    fn palette_is_stable_and_cycles() {
        let mut palette = Palette::new();
        let first = palette.assign("get");
        for i in 0..PALETTE.len() {
            palette.assign(&format!("cmd{}", i));
        }
        assert_eq!(palette.assign("get"), first);
        assert_eq!(palette.assign("cmd9"), PALETTE[0]);
    }
}
