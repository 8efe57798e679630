//! The latency engine: a repeating poll loop over a snapshot source.
//!
//! ```text
//!            arm()                 tick fires
//!   Idle ───────────▶ Armed ─────────────────▶ Polling
//!    ▲                  ▲                         │
//!    │ cancel()         └──── publish / skip ─────┘
//!    └──────────────── Armed
//! ```
//!
//! Each tick queries the source, differences the result against the
//! previous snapshot, folds the latencies into the [`SeriesMap`] and
//! publishes the new state on a watch channel. Ticks never overlap: a tick
//! that finds another one still in flight returns [`TickOutcome::Busy`].

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::EngineConfig;
use crate::data::{compute_latencies, PreviousCounters, SeriesMap};
use crate::error::ConfigError;
use crate::source::{Snapshot, SnapshotSource, Target};

/// Scheduling state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No timer running.
    Idle,
    /// Timer running, waiting for the next tick.
    Armed,
    /// A query is in flight.
    Polling,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// New state was folded in and published.
    Published,
    /// No target configured; nothing to show yet.
    NoTarget,
    /// The source had nothing to report.
    NoData,
    /// The previous tick has not completed yet.
    Busy,
    /// The source query failed. State is unchanged.
    Failed(String),
    /// The engine was cancelled or reset while the query was in flight.
    Discarded,
}

/// State published to presentation adapters after every successful tick.
///
/// Both fields are shared, immutable views; the engine replaces them
/// rather than mutating them.
#[derive(Debug, Clone, Default)]
pub struct Published {
    /// Latest raw counters.
    pub snapshot: Arc<Snapshot>,
    /// Latency history per command.
    pub series: Arc<SeriesMap>,
    /// Time of the last update, milliseconds since the Unix epoch.
    pub updated_ms: u64,
    /// Number of successful ticks since the engine started or was reset.
    pub ticks: u64,
}

/// Polls a [`SnapshotSource`] on a timer and maintains per-command latency history.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use cmdstat_watch::{EngineConfig, LatencyEngine, RespSource, Target};
///
/// # tokio_test::block_on(async {
/// let source = Arc::new(RespSource::new("127.0.0.1:6379"));
/// let engine = LatencyEngine::new(source, EngineConfig::default()).unwrap();
/// engine.set_target(Some(Target::new("127.0.0.1:6379")));
///
/// let mut updates = engine.subscribe();
/// engine.arm();
///
/// updates.changed().await.unwrap();
/// let state = updates.borrow().clone();
/// println!("{} commands tracked", state.series.len());
/// # });
/// ```
pub struct LatencyEngine {
    core: Arc<Core>,
    control: Mutex<Control>,
}

struct Control {
    config: EngineConfig,
    timer: Option<Timer>,
}

/// Handle to the spawned poll loop.
struct Timer {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Timer {
    fn stop(self) {
        let _ = self.stop_tx.send(true);
    }

    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Everything a tick touches. Shared between the engine and its poll loop.
struct Core {
    source: Arc<dyn SnapshotSource>,
    target: Mutex<Option<Target>>,
    limit: AtomicUsize,
    aggregation: Mutex<Aggregation>,
    in_flight: AtomicBool,
    /// Bumped on cancel/reset so in-flight ticks discard their result.
    generation: AtomicU64,
    published: watch::Sender<Published>,
}

#[derive(Default)]
struct Aggregation {
    previous: PreviousCounters,
    snapshot: Arc<Snapshot>,
    series: Arc<SeriesMap>,
    ticks: u64,
    updated_ms: u64,
}

impl Aggregation {
    fn to_published(&self) -> Published {
        Published {
            snapshot: self.snapshot.clone(),
            series: self.series.clone(),
            updated_ms: self.updated_ms,
            ticks: self.ticks,
        }
    }
}

/// Marks a tick as in flight; cleared on drop, including when the tick
/// future is dropped mid-query.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Core {
    async fn tick(&self) -> TickOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return TickOutcome::Busy;
        };
        let generation = self.generation.load(Ordering::Acquire);

        let target = self.target.lock().clone();
        let Some(target) = target else {
            return TickOutcome::NoTarget;
        };

        let snapshot = match self.source.query(&target).await {
            Ok(Some(snapshot)) if !snapshot.is_empty() => snapshot,
            Ok(_) => return TickOutcome::NoData,
            Err(e) => {
                tracing::warn!(source = self.source.description(), error = %e, "snapshot query failed");
                return TickOutcome::Failed(e.to_string());
            }
        };

        let time = now_ms();

        // Published state mirrors the aggregation: send while holding the lock
        let mut agg = self.aggregation.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            return TickOutcome::Discarded;
        }

        let limit = self.limit.load(Ordering::Relaxed);
        let latencies = compute_latencies(&agg.previous, &snapshot);
        let series = agg
            .series
            .as_ref()
            .clone()
            .append_sample(&snapshot, &latencies, time, limit);

        agg.previous = PreviousCounters::from_snapshot(&snapshot);
        agg.series = Arc::new(series);
        agg.snapshot = Arc::new(snapshot);
        agg.ticks += 1;
        agg.updated_ms = time;

        tracing::debug!(
            commands = agg.snapshot.len(),
            ticks = agg.ticks,
            "published latency update"
        );
        self.published.send_replace(agg.to_published());
        TickOutcome::Published
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl LatencyEngine {
    /// Create an idle engine with an empty history.
    ///
    /// Fails if `config` has a zero interval or a zero history limit.
    pub fn new(source: Arc<dyn SnapshotSource>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (published, _) = watch::channel(Published::default());
        let core = Core {
            source,
            target: Mutex::new(None),
            limit: AtomicUsize::new(config.max_items_per_series),
            aggregation: Mutex::new(Aggregation::default()),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            published,
        };

        Ok(Self {
            core: Arc::new(core),
            control: Mutex::new(Control {
                config,
                timer: None,
            }),
        })
    }

    /// Set or clear the query target.
    ///
    /// Switching to a different target forgets the previous counters, so
    /// the next tick starts from lifetime averages instead of differencing
    /// two unrelated servers. A tick still querying the old target is
    /// discarded.
    pub fn set_target(&self, target: Option<Target>) {
        {
            let mut current = self.core.target.lock();
            if *current == target {
                return;
            }
            *current = target;
        }

        let mut agg = self.core.aggregation.lock();
        self.core.invalidate();
        agg.previous = PreviousCounters::default();
    }

    /// Returns the current query target, if any.
    pub fn target(&self) -> Option<Target> {
        self.core.target.lock().clone()
    }

    /// Returns a copy of the active configuration.
    pub fn config(&self) -> EngineConfig {
        self.control.lock().config.clone()
    }

    /// Start polling at the configured interval. The first tick fires
    /// immediately.
    ///
    /// Any running timer is cancelled first. Must be called within a Tokio
    /// runtime.
    pub fn arm(&self) {
        let mut control = self.control.lock();
        if let Some(timer) = control.timer.take() {
            timer.stop();
        }

        let interval = control.config.interval();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let core = self.core.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            biased;
                            _ = stop_rx.changed() => break,
                            outcome = core.tick() => {
                                tracing::trace!(?outcome, "tick");
                            }
                        }
                    }
                }
            }
        });

        tracing::info!(
            interval_ms = control.config.interval_ms,
            source = self.core.source.description(),
            "latency engine armed"
        );
        control.timer = Some(Timer { stop_tx, task });
    }

    /// Stop polling. Calling this on an idle engine does nothing.
    ///
    /// A tick whose query is still in flight will not fold its result in.
    pub fn cancel(&self) {
        let timer = self.control.lock().timer.take();
        self.core.invalidate();
        if let Some(timer) = timer {
            timer.stop();
            tracing::info!("latency engine cancelled");
        }
    }

    /// Apply a new configuration.
    ///
    /// A changed interval re-arms a running timer. A smaller history limit
    /// trims existing series straight away.
    pub fn reconfigure(&self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;

        let rearm = {
            let mut control = self.control.lock();
            let shrunk = config.max_items_per_series < control.config.max_items_per_series;
            let interval_changed = config.interval_ms != control.config.interval_ms;
            let armed = control.timer.is_some();

            self.core
                .limit
                .store(config.max_items_per_series, Ordering::Relaxed);
            if shrunk {
                self.truncate(config.max_items_per_series);
            }
            control.config = config;
            interval_changed && armed
        };

        if rearm {
            self.arm();
        }
        Ok(())
    }

    fn truncate(&self, limit: usize) {
        let mut agg = self.core.aggregation.lock();
        let mut series = agg.series.as_ref().clone();
        series.truncate(limit);
        agg.series = Arc::new(series);
        self.core.published.send_replace(agg.to_published());
    }

    /// Run one tick now, outside the timer.
    pub async fn tick(&self) -> TickOutcome {
        self.core.tick().await
    }

    /// Cancel polling and discard all history.
    pub fn reset(&self) {
        self.cancel();
        let mut agg = self.core.aggregation.lock();
        *agg = Aggregation::default();
        self.core.published.send_replace(agg.to_published());
    }

    /// Returns the scheduling state, reporting `Polling` while a query is in flight.
    pub fn state(&self) -> EngineState {
        if self.core.in_flight.load(Ordering::Acquire) {
            return EngineState::Polling;
        }
        match &self.control.lock().timer {
            Some(timer) if timer.is_running() => EngineState::Armed,
            _ => EngineState::Idle,
        }
    }

    /// Receive every published update.
    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.core.published.subscribe()
    }

    /// The most recently published state.
    pub fn latest(&self) -> Published {
        self.core.published.borrow().clone()
    }
}

impl Drop for LatencyEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for LatencyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyEngine")
            .field("source", &self.core.source.description())
            .field("config", &self.control.lock().config)
            .finish()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
