//! Layered configuration.
//!
//! Settings are built from defaults, then an optional TOML file, then
//! environment variables prefixed with `CMDSTAT` (nested keys separated by
//! `__`). Command-line flags are applied on top by the binary.
//!
//! ```toml
//! [engine]
//! interval_ms = 1000
//! max_items_per_series = 300
//! hide_zero = false
//! view_mode = "graph"
//!
//! [target]
//! datasource = "127.0.0.1:6379"
//! section = "commandstats"
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::data::DEFAULT_MAX_ITEMS_PER_SERIES;
use crate::error::ConfigError;
use crate::panel::ViewMode;
use crate::source::Target;

/// Default polling interval for a panel.
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;

/// Polling interval used by the full-page view.
pub const PAGE_INTERVAL_MS: u64 = 1_800_000;

/// History length used by the full-page view.
pub const PAGE_MAX_ITEMS_PER_SERIES: usize = 1_000;

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "CMDSTAT";

/// Options read by the latency engine and its presentation adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Polling interval in milliseconds.
    pub interval_ms: u64,
    pub view_mode: ViewMode,
    /// Points kept per command before the oldest is evicted.
    pub max_items_per_series: usize,
    /// Graph view only: leave out series that are all zero.
    pub hide_zero: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            view_mode: ViewMode::Table,
            max_items_per_series: DEFAULT_MAX_ITEMS_PER_SERIES,
            hide_zero: false,
        }
    }
}

impl EngineConfig {
    /// Defaults for the full-page view: slow polling, long history.
    pub fn page() -> Self {
        Self {
            interval_ms: PAGE_INTERVAL_MS,
            max_items_per_series: PAGE_MAX_ITEMS_PER_SERIES,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid("interval_ms must be positive".to_string()));
        }
        if self.max_items_per_series == 0 {
            return Err(ConfigError::Invalid(
                "max_items_per_series must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    /// Where to poll. `None` leaves the engine with nothing to show.
    pub target: Option<Target>,
}

impl Settings {
    /// Load settings from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.engine.validate()?;
        Ok(settings)
    }
}
