//! Deduplicator
//!
//! Traffic shaping on top of the replay guard: content already processed in
//! the last `time_window_secs` is not handed downstream again, subject to the
//! LRU cache capacity. Every call passes admission control first.
//!
//! Failure handling:
//! - Admission refused → [`GuardError::RateLimitExceeded`]; callers use
//!   [`Deduplicator::is_duplicate_safe`] or [`Deduplicator::conservative_check`]
//! - Consecutive internal errors (poisoned locks) reaching `error_threshold`
//!   → [`GuardError::SystemOverload`]. Refusals never count toward it
//! - A successful cache operation resets the counter

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::clock::SharedClock;
use crate::config::DedupConfig;
use crate::error::{GuardError, GuardResult};
use crate::fingerprint::MessageFingerprint;
use crate::lru::LruCache;
use crate::rate_limit::{RateLimiter, RateLimiterStatistics};
use crate::sweeper::Sweep;

const ELEVATED_UTILIZATION: f64 = 0.80;
const CRITICAL_UTILIZATION: f64 = 0.95;

/// Cache pressure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheHealth {
    /// Below 80% full
    Healthy,
    /// At least 80% full
    Elevated,
    /// At least 95% full
    Critical,
}

impl CacheHealth {
    /// Classify a fill ratio.
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization >= CRITICAL_UTILIZATION {
            Self::Critical
        } else if utilization >= ELEVATED_UTILIZATION {
            Self::Elevated
        } else {
            Self::Healthy
        }
    }
}

/// Deduplicator counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupStatistics {
    /// Entries in the cache
    pub cached: usize,
    /// Cache capacity
    pub capacity: usize,
    /// `cached / capacity`
    pub utilization: f64,
    /// Pressure classification
    pub health: CacheHealth,
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that recorded a new entry
    pub misses: u64,
    /// Entries evicted by capacity pressure
    pub evictions: u64,
    /// Entries removed by age sweeps
    pub swept: u64,
    /// Internal errors since the last successful cache operation
    pub consecutive_errors: u32,
    /// Admission control snapshot
    pub rate_limiter: RateLimiterStatistics,
}

#[derive(Debug)]
struct DedupState {
    /// unique_id -> local time first seen
    cache: LruCache<String, u64>,
    hits: u64,
    misses: u64,
    evictions: u64,
    swept: u64,
}

/// Bounded, time-windowed duplicate filter.
pub struct Deduplicator {
    config: DedupConfig,
    clock: SharedClock,
    limiter: RateLimiter,
    state: Mutex<DedupState>,
    consecutive_errors: AtomicU32,
}

impl Deduplicator {
    /// Create a deduplicator with its own rate limiter.
    pub fn new(config: DedupConfig, clock: SharedClock) -> Self {
        let limiter = RateLimiter::new(config.rate_limit.clone(), clock.clone());
        let state = DedupState {
            cache: LruCache::new(config.capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
            swept: 0,
        };
        Self {
            config,
            clock,
            limiter,
            state: Mutex::new(state),
            consecutive_errors: AtomicU32::new(0),
        }
    }

    /// Run admission control.
    pub fn admit(&self) -> GuardResult<()> {
        match self.limiter.check() {
            Err(GuardError::Internal(reason)) => Err(self.record_failure(GuardError::Internal(reason))),
            outcome => outcome,
        }
    }

    /// Admission plus cache check. `Ok(true)` means already processed.
    pub fn is_duplicate(
        &self,
        message_id: &str,
        sender_id: &str,
        timestamp: u32,
        content: &[u8],
    ) -> GuardResult<bool> {
        self.admit()?;
        self.check_fingerprint(&MessageFingerprint::new(message_id, sender_id, timestamp, content))
    }

    /// Never fails. Under rate limiting falls back to [`conservative_check`](Self::conservative_check);
    /// on overload or internal error reports a duplicate.
    pub fn is_duplicate_safe(&self, message_id: &str, sender_id: &str, timestamp: u32, content: &[u8]) -> bool {
        let fingerprint = MessageFingerprint::new(message_id, sender_id, timestamp, content);
        let outcome = self
            .admit()
            .and_then(|()| self.check_fingerprint(&fingerprint));

        match outcome {
            Ok(duplicate) => duplicate,
            Err(GuardError::RateLimitExceeded { .. }) => self.conservative_check(&fingerprint),
            Err(e) => {
                tracing::warn!(
                    sender_id = %fingerprint.sender_id,
                    error = %e,
                    "Dedup failing closed, treating message as duplicate"
                );
                true
            }
        }
    }

    /// Cache check without admission control. Records the fingerprint when new.
    pub fn check_fingerprint(&self, fingerprint: &MessageFingerprint) -> GuardResult<bool> {
        let now = self.clock.now_secs();
        let key = fingerprint.unique_id();
        let mut state = self.lock().map_err(|e| self.record_failure(e))?;
        self.consecutive_errors.store(0, Ordering::SeqCst);

        if let Some(&seen_at) = state.cache.get(&key) {
            if now.saturating_sub(seen_at) <= self.config.time_window_secs {
                state.hits += 1;
                return Ok(true);
            }
        }

        // New, or seen long enough ago to count as new
        if state.cache.set(key, now).is_some() {
            state.evictions += 1;
        }
        state.misses += 1;
        Ok(false)
    }

    /// Read-only lookup used while admission control is refusing work.
    ///
    /// Does not record or promote anything. A poisoned lock reads as duplicate
    /// and counts as an internal error.
    pub fn conservative_check(&self, fingerprint: &MessageFingerprint) -> bool {
        let now = self.clock.now_secs();
        match self.lock() {
            Ok(state) => state
                .cache
                .peek(fingerprint.unique_id().as_str())
                .is_some_and(|&seen_at| now.saturating_sub(seen_at) <= self.config.time_window_secs),
            Err(e) => {
                self.record_failure(e);
                true
            }
        }
    }

    /// Remove entries older than the window. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_secs();
        let window = self.config.time_window_secs;
        match self.lock() {
            Ok(mut state) => {
                let removed = state.cache.retain(|_, &seen_at| now.saturating_sub(seen_at) <= window);
                state.swept += removed as u64;
                if removed > 0 {
                    tracing::debug!(removed, remaining = state.cache.len(), "Dedup cache swept");
                }
                removed
            }
            Err(e) => {
                tracing::error!(error = %e, "Dedup sweep skipped");
                0
            }
        }
    }

    /// Current cache pressure.
    pub fn health(&self) -> CacheHealth {
        match self.state.lock() {
            Ok(state) => CacheHealth::from_utilization(utilization(&state.cache)),
            Err(_) => CacheHealth::Critical,
        }
    }

    /// Counter snapshot.
    pub fn statistics(&self) -> GuardResult<DedupStatistics> {
        let rate_limiter = self.limiter.statistics()?;
        let state = self.lock()?;
        let utilization = utilization(&state.cache);
        Ok(DedupStatistics {
            cached: state.cache.len(),
            capacity: state.cache.capacity(),
            utilization,
            health: CacheHealth::from_utilization(utilization),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            swept: state.swept,
            consecutive_errors: self.consecutive_errors(),
            rate_limiter,
        })
    }

    /// Internal errors since the last successful cache operation.
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors.load(Ordering::SeqCst)
    }

    /// The limiter in front of the cache.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Active configuration.
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    fn lock(&self) -> GuardResult<MutexGuard<'_, DedupState>> {
        self.state
            .lock()
            .map_err(|_| GuardError::Internal("dedup cache lock poisoned".into()))
    }

    /// Count an internal error and escalate to `SystemOverload` at the threshold.
    fn record_failure(&self, error: GuardError) -> GuardError {
        let previous = self
            .consecutive_errors
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(1)))
            .unwrap_or(u32::MAX);
        let consecutive_errors = previous.saturating_add(1);
        if consecutive_errors >= self.config.error_threshold {
            tracing::error!(
                consecutive_errors,
                threshold = self.config.error_threshold,
                cause = %error,
                "Dedup subsystem overloaded"
            );
            GuardError::SystemOverload { consecutive_errors }
        } else {
            error
        }
    }
}

#[cfg(test)]
impl Deduplicator {
    /// Poison the cache lock the way a panicking holder would.
    pub(crate) fn poison_state(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _state = self.state.lock();
            panic!("dedup state holder panicked");
        }));
    }

    /// Clear a poisoned cache lock.
    pub(crate) fn clear_poison(&self) {
        self.state.clear_poison();
    }
}

fn utilization(cache: &LruCache<String, u64>) -> f64 {
    cache.len() as f64 / cache.capacity() as f64
}

impl Sweep for Deduplicator {
    fn sweep(&self) -> usize {
        Deduplicator::sweep(self)
    }

    fn name(&self) -> &'static str {
        "deduplicator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RateLimitConfig;

    const NOW: u64 = 1_700_000_040;

    fn dedup(config: DedupConfig) -> (Deduplicator, ManualClock) {
        let clock = ManualClock::new(NOW);
        (Deduplicator::new(config, clock.shared()), clock)
    }

    fn small(capacity: usize, per_second: u32) -> DedupConfig {
        DedupConfig {
            capacity,
            rate_limit: RateLimitConfig {
                per_second,
                per_minute: 10_000,
            },
            ..DedupConfig::default()
        }
    }

    #[test]
    fn second_send_is_duplicate() {
        let (dedup, clock) = dedup(DedupConfig::default());
        assert!(!dedup.is_duplicate("abc-123", "peerA", NOW as u32, b"hello").unwrap());
        clock.advance(2);
        assert!(dedup.is_duplicate("abc-123", "peerA", NOW as u32, b"hello").unwrap());
    }

    #[test]
    fn entry_expires_after_window() {
        let (dedup, clock) = dedup(DedupConfig::default());
        assert!(!dedup.is_duplicate("m", "p", 0, b"x").unwrap());
        clock.advance(1801);
        assert!(!dedup.is_duplicate("m", "p", 0, b"x").unwrap());
    }

    #[test]
    fn rate_limited_safe_path_is_read_only() {
        let (dedup, _clock) = dedup(small(100, 2));
        assert!(!dedup.is_duplicate_safe("a", "p", 0, b"1"));
        assert!(!dedup.is_duplicate_safe("b", "p", 0, b"2"));

        // Limiter is now refusing: known content still reads as duplicate,
        // new content passes without being recorded
        assert!(dedup.is_duplicate_safe("a", "p", 0, b"1"));
        assert!(!dedup.is_duplicate_safe("c", "p", 0, b"3"));
        assert_eq!(dedup.statistics().unwrap().cached, 2);
        assert_eq!(dedup.consecutive_errors(), 0);
    }

    #[test]
    fn refusals_never_escalate_to_overload() {
        let (dedup, _clock) = dedup(DedupConfig {
            error_threshold: 3,
            ..small(100, 1)
        });
        assert!(dedup.admit().is_ok());
        for _ in 0..20 {
            assert!(matches!(dedup.admit(), Err(GuardError::RateLimitExceeded { .. })));
        }
        for i in 0..20 {
            assert!(matches!(
                dedup.is_duplicate(&format!("m{i}"), "p", 0, b"x"),
                Err(GuardError::RateLimitExceeded { .. })
            ));
        }
        assert_eq!(dedup.consecutive_errors(), 0);
    }

    #[test]
    fn poisoned_cache_fails_closed() {
        let (dedup, _clock) = dedup(DedupConfig::default());
        assert!(!dedup.is_duplicate_safe("seen", "p", 0, b"x"));
        dedup.poison_state();

        let fresh = MessageFingerprint::new("fresh", "p", 0, b"y");
        assert!(dedup.is_duplicate_safe("fresh", "p", 0, b"y"));
        assert!(dedup.conservative_check(&fresh));
        assert!(matches!(dedup.check_fingerprint(&fresh), Err(GuardError::Internal(_))));
        assert_eq!(dedup.consecutive_errors(), 3);
        assert_eq!(dedup.health(), CacheHealth::Critical);
    }

    #[test]
    fn internal_errors_escalate_then_reset_on_success() {
        let (dedup, _clock) = dedup(DedupConfig {
            error_threshold: 3,
            ..DedupConfig::default()
        });
        dedup.poison_state();

        assert!(matches!(dedup.is_duplicate("a", "p", 0, b"x"), Err(GuardError::Internal(_))));
        assert!(matches!(dedup.is_duplicate("b", "p", 0, b"x"), Err(GuardError::Internal(_))));
        assert_eq!(
            dedup.is_duplicate("c", "p", 0, b"x"),
            Err(GuardError::SystemOverload {
                consecutive_errors: 3
            })
        );
        // Overload fails closed on the safe path
        assert!(dedup.is_duplicate_safe("d", "p", 0, b"x"));
        assert_eq!(dedup.consecutive_errors(), 4);

        dedup.clear_poison();
        assert!(!dedup.is_duplicate("e", "p", 0, b"x").unwrap());
        assert_eq!(dedup.consecutive_errors(), 0);
    }

    #[test]
    fn failure_counter_saturates() {
        let (dedup, _clock) = dedup(DedupConfig::default());
        dedup.consecutive_errors.store(u32::MAX - 1, Ordering::SeqCst);
        dedup.poison_state();

        for _ in 0..3 {
            assert_eq!(
                dedup.is_duplicate("m", "p", 0, b"x"),
                Err(GuardError::SystemOverload {
                    consecutive_errors: u32::MAX
                })
            );
        }
        assert_eq!(dedup.consecutive_errors(), u32::MAX);
    }

    #[test]
    fn capacity_eviction_counts() {
        let (dedup, _clock) = dedup(small(2, 100));
        for id in ["a", "b", "c"] {
            assert!(!dedup.is_duplicate(id, "p", 0, b"x").unwrap());
        }
        let stats = dedup.statistics().unwrap();
        assert_eq!(stats.cached, 2);
        assert_eq!(stats.evictions, 1);
        // "a" was evicted, so it reads as new again
        assert!(!dedup.is_duplicate("a", "p", 0, b"x").unwrap());
    }

    #[test]
    fn sweep_removes_aged_entries_below_capacity() {
        let (dedup, clock) = dedup(DedupConfig::default());
        assert!(!dedup.is_duplicate("old", "p", 0, b"x").unwrap());
        clock.advance(1000);
        assert!(!dedup.is_duplicate("new", "p", 0, b"x").unwrap());
        clock.advance(900);

        assert_eq!(dedup.sweep(), 1);
        let stats = dedup.statistics().unwrap();
        assert_eq!(stats.cached, 1);
        assert_eq!(stats.swept, 1);
    }

    #[test]
    fn health_thresholds() {
        assert_eq!(CacheHealth::from_utilization(0.5), CacheHealth::Healthy);
        assert_eq!(CacheHealth::from_utilization(0.8), CacheHealth::Elevated);
        assert_eq!(CacheHealth::from_utilization(0.95), CacheHealth::Critical);

        let (dedup, _clock) = dedup(small(10, 100));
        for i in 0..8 {
            dedup.is_duplicate(&format!("m{i}"), "p", 0, b"x").unwrap();
        }
        assert_eq!(dedup.health(), CacheHealth::Elevated);
        dedup.is_duplicate("m8", "p", 0, b"x").unwrap();
        dedup.is_duplicate("m9", "p", 0, b"x").unwrap();
        assert_eq!(dedup.health(), CacheHealth::Critical);
    }

    #[test]
    fn statistics_serialize_to_json() {
        let (dedup, _clock) = dedup(DedupConfig::default());
        dedup.is_duplicate("m", "p", 0, b"x").unwrap();
        let json = serde_json::to_value(dedup.statistics().unwrap()).unwrap();
        assert_eq!(json["misses"], 1);
        assert_eq!(json["health"], "Healthy");
        assert_eq!(json["rate_limiter"]["total_admitted"], 1);
    }
}
