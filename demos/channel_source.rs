//! Example: feeding the latency engine from a channel.
//!
//! Simulates a store whose `get` command slowly gets slower, pushes its
//! cumulative counters through a `ChannelSource`, and prints the graph
//! frames the panel produces.
//!
//! Run with: cargo run --example channel_source

use std::sync::Arc;
use std::time::Duration;

use cmdstat_watch::{
    ChannelSource, CommandRow, EngineConfig, Frame, LatencyEngine, LatencyPanel, Snapshot, Target,
    ViewMode,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (tx, source) = ChannelSource::create("simulated");

    let config = EngineConfig {
        interval_ms: 200,
        view_mode: ViewMode::Graph,
        max_items_per_series: 5,
        hide_zero: true,
    };
    let engine = LatencyEngine::new(Arc::new(source), config.clone())?;
    engine.set_target(Some(Target::new("simulated")));
    let mut panel = LatencyPanel::new(&engine, &config);

    // Producer: cumulative counters, as the store would report them
    tokio::spawn(async move {
        let (mut calls, mut usec) = (0u64, 0u64);
        for step in 1..=20u64 {
            calls += 100;
            usec += 100 * (50 + step * 10);
            let snapshot = Snapshot::new(vec![
                CommandRow::new("get", calls, usec),
                CommandRow::new("ping", 1, 1),
            ]);
            if tx.send(Some(snapshot)).is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });

    engine.arm();

    for _ in 0..10 {
        let Some(frame) = panel.next_frame().await else {
            break;
        };
        if let Frame::Graph { series, .. } = frame {
            for line in series {
                let values: Vec<String> = line
                    .points
                    .iter()
                    .map(|(_, v)| format!("{:.0}", v))
                    .collect();
                println!("{:<6} {} [{}]", line.command, line.color, values.join(", "));
            }
            println!();
        }
    }

    engine.cancel();
    Ok(())
}
