use crate::{
    buffer::Capacity,
    event_log::EventFilter,
    mode::OperatingMode,
    playback::{DEFAULT_MAX_SPEED, DEFAULT_MIN_SPEED},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    pub mode: OperatingMode,
    /// Timer period at 1.0x, in milliseconds.
    pub base_tick_ms: u64,
    pub initial_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// Reconcile every skipped index when the cursor jumps forward
    /// (forward seeks, live-follow catch-up). Off: skipped ticks never
    /// reach the log.
    pub emit_skipped_events: bool,
    pub capacity: Capacity,
    /// A tick with more described events than this is logged as one summary line.
    pub collapse_threshold: usize,
    /// Visible entries the log panel shows.
    pub display_limit: usize,
    pub initial_filter: EventFilter,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            mode:                OperatingMode::default(),
            base_tick_ms:        500,
            initial_speed:       1.0,
            min_speed:           DEFAULT_MIN_SPEED,
            max_speed:           DEFAULT_MAX_SPEED,
            emit_skipped_events: false,
            capacity:            Capacity::Unbounded,
            collapse_threshold:  3,
            display_limit:       50,
            initial_filter:      EventFilter::All,
        }
    }
}

impl ReplayConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    /// In tests, use ReplayConfig::default() or a mode helper.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn for_mode(mode: OperatingMode) -> Self {
        Self { mode, ..Self::default() }
    }

    pub fn base_tick(&self) -> Duration {
        Duration::from_millis(self.base_tick_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_tick_ms == 0 {
            anyhow::bail!("base_tick_ms must be positive");
        }
        if !(self.min_speed.is_finite() && self.min_speed > 0.0) {
            anyhow::bail!("min_speed must be a positive number, got {}", self.min_speed);
        }
        if !(self.max_speed.is_finite() && self.max_speed >= self.min_speed) {
            anyhow::bail!(
                "max_speed must be at least min_speed ({}), got {}",
                self.min_speed,
                self.max_speed
            );
        }
        if let Capacity::Ring(0) = self.capacity {
            anyhow::bail!("ring capacity must be at least 1");
        }
        Ok(())
    }
}
