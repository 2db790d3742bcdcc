//! Defense layer configuration.
//!
//! All values are passed in at construction time. Hosts typically embed a
//! `[defense]`-style TOML table and load it with [`DefenseConfig::from_toml_str`].

use serde::{Deserialize, Serialize};
use signalair_wire::ValidatorConfig;
use std::time::Duration;

use crate::error::ConfigError;

/// Replay guard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Maximum message age accepted (seconds)
    pub time_window_secs: u64,
    /// Maximum amount a timestamp may run ahead of the local clock (seconds)
    pub clock_skew_secs: u64,
    /// Interval between periodic sweeps (seconds)
    pub sweep_interval_secs: u64,
    /// Hard cap on tracked fingerprints
    pub max_entries: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            time_window_secs: 300, // 5 minutes
            clock_skew_secs: 30,
            sweep_interval_secs: 60,
            max_entries: 10_000,
        }
    }
}

impl ReplayConfig {
    /// Sweep interval as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Rate limiter ceilings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Checks admitted per wall-clock second
    pub per_second: u32,
    /// Checks admitted per wall-clock minute
    pub per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 50,
            per_minute: 1000,
        }
    }
}

/// Deduplicator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// LRU cache capacity
    pub capacity: usize,
    /// How long a fingerprint counts as seen (seconds)
    pub time_window_secs: u64,
    /// Interval between periodic sweeps (seconds)
    pub sweep_interval_secs: u64,
    /// Consecutive internal errors before `SystemOverload` is raised
    pub error_threshold: u32,
    /// Admission control in front of the cache
    pub rate_limit: RateLimitConfig,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            time_window_secs: 1800, // 30 minutes
            sweep_interval_secs: 600,
            error_threshold: 10,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl DedupConfig {
    /// Sweep interval as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Complete defense layer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    /// Schema validator bounds
    pub validator: ValidatorConfig,
    /// Replay guard
    pub replay: ReplayConfig,
    /// Deduplicator and its rate limiter
    pub dedup: DedupConfig,
}

impl DefenseConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero capacities, windows and ceilings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero: [(&'static str, u64); 10] = [
            ("validator.max_clock_drift_secs", self.validator.max_clock_drift_secs),
            ("validator.signal_inner_drift_secs", self.validator.signal_inner_drift_secs),
            ("replay.time_window_secs", self.replay.time_window_secs),
            ("replay.sweep_interval_secs", self.replay.sweep_interval_secs),
            ("replay.max_entries", self.replay.max_entries as u64),
            ("dedup.capacity", self.dedup.capacity as u64),
            ("dedup.time_window_secs", self.dedup.time_window_secs),
            ("dedup.sweep_interval_secs", self.dedup.sweep_interval_secs),
            ("dedup.error_threshold", u64::from(self.dedup.error_threshold)),
            ("dedup.rate_limit.per_second", u64::from(self.dedup.rate_limit.per_second)),
        ];
        if let Some((field, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroValue { field });
        }

        let rate = &self.dedup.rate_limit;
        if rate.per_minute < rate.per_second {
            return Err(ConfigError::Inconsistent(format!(
                "dedup.rate_limit.per_minute ({}) is below per_second ({})",
                rate.per_minute, rate.per_second
            )));
        }

        Ok(())
    }
}
