//! Engine-level configuration: broadcast cadence, idle reaping, and channel
//! sizing. Loaded once at startup from the environment with baked-in
//! defaults.

use std::{env, time::Duration};

use tracing::warn;

/// Default gap between change-detection sweeps.
const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_millis(100);
/// Default window after which a match with no advancing event is finalized.
const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(30 * 60);
/// Default per-group snapshot channel capacity.
const DEFAULT_SNAPSHOT_CAPACITY: usize = 16;

const BROADCAST_INTERVAL_ENV: &str = "VANTAGE_BROADCAST_INTERVAL_MS";
const IDLE_THRESHOLD_ENV: &str = "VANTAGE_IDLE_THRESHOLD_SECS";
const SNAPSHOT_CAPACITY_ENV: &str = "VANTAGE_SNAPSHOT_CAPACITY";

/// Immutable runtime configuration shared across the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interval of the change-detecting broadcast sweep.
    pub broadcast_interval: Duration,
    /// Idle window after which a match is finalized and removed.
    pub idle_threshold: Duration,
    /// Capacity of each per-group-code snapshot channel.
    pub snapshot_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            broadcast_interval: DEFAULT_BROADCAST_INTERVAL,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            snapshot_channel_capacity: DEFAULT_SNAPSHOT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Load the configuration from the environment, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            broadcast_interval: env_value(BROADCAST_INTERVAL_ENV)
                .map(Duration::from_millis)
                .unwrap_or(defaults.broadcast_interval),
            idle_threshold: env_value(IDLE_THRESHOLD_ENV)
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_threshold),
            snapshot_channel_capacity: env_value(SNAPSHOT_CAPACITY_ENV)
                .map(|value: u64| value.max(1) as usize)
                .unwrap_or(defaults.snapshot_channel_capacity),
        }
    }
}

fn env_value<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, value = %raw, "unparsable configuration value; using default");
            None
        }
    }
}
