//! Admission control for the defense layer.
//!
//! Two fixed windows keyed on the wall clock: the current second and the
//! current minute (`now / 60`). A check is admitted only while both windows
//! are under their ceilings; admitted checks count against both. The limiter
//! throttles the defense layer's own work under a flood and is independent of
//! any transport-level limiting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

use crate::clock::SharedClock;
use crate::config::RateLimitConfig;
use crate::error::{GuardError, GuardResult};

/// Which window refused a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateWindow {
    /// Per-second window
    Second,
    /// Per-minute window
    Minute,
}

impl fmt::Display for RateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Second => write!(f, "second"),
            Self::Minute => write!(f, "minute"),
        }
    }
}

/// Point-in-time snapshot of limiter counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimiterStatistics {
    /// Checks admitted in the current second
    pub current_second: u32,
    /// Per-second ceiling
    pub max_per_second: u32,
    /// Checks admitted in the current minute
    pub current_minute: u32,
    /// Per-minute ceiling
    pub max_per_minute: u32,
    /// Lifetime admitted checks
    pub total_admitted: u64,
    /// Lifetime refused checks
    pub total_rejected: u64,
    /// Fullest of the two windows, 0.0 to 1.0
    pub utilization: f64,
}

#[derive(Debug, Default)]
struct LimiterState {
    second: u64,
    second_count: u32,
    minute: u64,
    minute_count: u32,
    total: u64,
    rejected: u64,
}

impl LimiterState {
    fn roll(&mut self, now: u64) {
        if self.second != now {
            self.second = now;
            self.second_count = 0;
        }
        let minute = now / 60;
        if self.minute != minute {
            self.minute = minute;
            self.minute_count = 0;
        }
    }
}

/// Per-second and per-minute admission control.
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: SharedClock,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter reading time from `clock`.
    pub fn new(config: RateLimitConfig, clock: SharedClock) -> Self {
        let now = clock.now_secs();
        Self {
            config,
            clock,
            state: Mutex::new(LimiterState {
                second: now,
                minute: now / 60,
                ..LimiterState::default()
            }),
        }
    }

    /// Admit one unit of work or refuse it.
    pub fn check(&self) -> GuardResult<()> {
        let now = self.clock.now_secs();
        let mut state = self
            .state
            .lock()
            .map_err(|_| GuardError::Internal("rate limiter lock poisoned".into()))?;
        state.roll(now);

        let refused = if state.second_count >= self.config.per_second {
            Some((RateWindow::Second, self.config.per_second))
        } else if state.minute_count >= self.config.per_minute {
            Some((RateWindow::Minute, self.config.per_minute))
        } else {
            None
        };

        if let Some((window, limit)) = refused {
            state.rejected += 1;
            tracing::debug!(window = %window, limit, "Rate limit exceeded");
            return Err(GuardError::RateLimitExceeded { window, limit });
        }

        state.second_count += 1;
        state.minute_count += 1;
        state.total += 1;
        Ok(())
    }

    /// Consistent snapshot taken under the limiter lock.
    pub fn statistics(&self) -> GuardResult<RateLimiterStatistics> {
        let now = self.clock.now_secs();
        let state = self
            .state
            .lock()
            .map_err(|_| GuardError::Internal("rate limiter lock poisoned".into()))?;

        // Windows that have rolled over read as empty
        let current_second = if state.second == now { state.second_count } else { 0 };
        let current_minute = if state.minute == now / 60 { state.minute_count } else { 0 };

        let per_second = f64::from(current_second) / f64::from(self.config.per_second.max(1));
        let per_minute = f64::from(current_minute) / f64::from(self.config.per_minute.max(1));

        Ok(RateLimiterStatistics {
            current_second,
            max_per_second: self.config.per_second,
            current_minute,
            max_per_minute: self.config.per_minute,
            total_admitted: state.total,
            total_rejected: state.rejected,
            utilization: per_second.max(per_minute),
        })
    }

    /// Clear all counters, including lifetime totals.
    pub fn reset(&self) -> GuardResult<()> {
        let now = self.clock.now_secs();
        let mut state = self
            .state
            .lock()
            .map_err(|_| GuardError::Internal("rate limiter lock poisoned".into()))?;
        *state = LimiterState {
            second: now,
            minute: now / 60,
            ..LimiterState::default()
        };
        Ok(())
    }

    /// Active ceilings.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
