use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cmdstat_watch::data::duration::parse_interval;
use cmdstat_watch::{
    EngineConfig, FileSource, Frame, LatencyEngine, LatencyPanel, RespSource, Settings,
    SnapshotSource, Target, ViewMode,
};

#[derive(Parser, Debug)]
#[command(name = "cmdstat-watch")]
#[command(about = "Track per-command latency from a key-value store's commandstats counters")]
struct Args {
    /// Settings file (TOML)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Poll a server over TCP (host:port)
    #[arg(short, long, conflicts_with = "file")]
    connect: Option<String>,

    /// Read counters from a file on every tick (INFO text or JSON)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Polling interval (e.g. "500ms", "1s", "30m")
    #[arg(short, long)]
    interval: Option<String>,

    /// Points kept per command
    #[arg(long)]
    max_items: Option<usize>,

    /// Graph view: leave out commands whose latency is always zero
    #[arg(long)]
    hide_zero: bool,

    /// Output view: table or graph
    #[arg(long)]
    view: Option<ViewMode>,

    /// Use the full-page defaults (30 minute interval, 1000 points)
    #[arg(long)]
    page: bool,

    /// Stop after this many updates
    #[arg(long)]
    ticks: Option<u64>,

    /// Write the last frame to this file on exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = build_settings(&args)?;
    let (source, target) = build_source(&args, &settings)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(&args, settings.engine, source, target))
}

/// Merge file/env settings with command-line overrides.
fn build_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;

    if args.page {
        let page = EngineConfig::page();
        settings.engine.interval_ms = page.interval_ms;
        settings.engine.max_items_per_series = page.max_items_per_series;
    }
    if let Some(ref interval) = args.interval {
        settings.engine.interval_ms = parse_interval(interval)?.as_millis() as u64;
    }
    if let Some(max_items) = args.max_items {
        settings.engine.max_items_per_series = max_items;
    }
    if let Some(view) = args.view {
        settings.engine.view_mode = view;
    }
    if args.hide_zero {
        settings.engine.hide_zero = true;
    }

    settings.engine.validate()?;
    Ok(settings)
}

/// Pick the snapshot source and the target to query.
fn build_source(args: &Args, settings: &Settings) -> Result<(Arc<dyn SnapshotSource>, Target)> {
    if let Some(ref addr) = args.connect {
        let target = match settings.target.clone() {
            Some(target) => Target {
                datasource: addr.clone(),
                ..target
            },
            None => Target::new(addr.as_str()),
        };
        return Ok((Arc::new(RespSource::new(addr)), target));
    }

    if let Some(ref path) = args.file {
        let target = Target::new(path.display().to_string());
        return Ok((Arc::new(FileSource::new(path)), target));
    }

    match settings.target.clone() {
        Some(target) => Ok((Arc::new(RespSource::new(&target.datasource)), target)),
        None => bail!("No source configured: use --connect, --file or a [target] section"),
    }
}

/// Run the engine and print one JSON frame per update.
async fn run(
    args: &Args,
    config: EngineConfig,
    source: Arc<dyn SnapshotSource>,
    target: Target,
) -> Result<()> {
    let engine = LatencyEngine::new(source, config.clone())?;
    engine.set_target(Some(target));
    let mut panel = LatencyPanel::new(&engine, &config);

    engine.arm();

    let mut last_frame: Option<Frame> = None;
    let mut updates = 0u64;
    loop {
        tokio::select! {
            frame = panel.next_frame() => {
                let Some(frame) = frame else { break };
                println!("{}", serde_json::to_string(&frame)?);
                last_frame = Some(frame);
                updates += 1;
                if args.ticks.is_some_and(|limit| updates >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    engine.cancel();

    if let Some(ref export_path) = args.export {
        let frame = last_frame.unwrap_or_else(|| panel.current_frame());
        export_frame(&frame, export_path)?;
    }
    Ok(())
}

/// Export a frame as pretty-printed JSON
fn export_frame(frame: &Frame, export_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(frame)?;
    std::fs::write(export_path, json)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    tracing::info!(path = %export_path.display(), "exported latency frame");
    Ok(())
}
