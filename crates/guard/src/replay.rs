//! Replay Guard
//!
//! Enforces temporal correctness: no message is processed outside its
//! validity window, whatever the cache pressure elsewhere. Policy, in order:
//!
//! 1. Older than `time_window_secs` → expired
//! 2. More than `clock_skew_secs` ahead of the local clock → from the future
//! 3. Fingerprint already seen → duplicate
//! 4. Otherwise the fingerprint is recorded and the message accepted
//!
//! The seen-set is pruned by periodic sweeps and bounded by a hard cap. When
//! the cap is exceeded an immediate sweep runs; if that is not enough the
//! oldest fingerprints are dropped. Both walk a timestamp-ordered index from
//! the oldest end, so they only touch the entries they remove.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{RwLock, RwLockWriteGuard};

use crate::clock::SharedClock;
use crate::config::ReplayConfig;
use crate::error::{GuardError, GuardResult};
use crate::fingerprint::MessageFingerprint;
use crate::sweeper::Sweep;

/// Outcome of a replay check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayVerdict {
    /// Fresh and unseen; now recorded
    Accepted,
    /// Timestamp older than the window
    RejectedExpired {
        /// Message age in seconds
        age: u64,
    },
    /// Timestamp too far ahead of the local clock
    RejectedFuture {
        /// Seconds ahead of the local clock
        ahead: u64,
    },
    /// Fingerprint already recorded
    RejectedDuplicate,
}

impl ReplayVerdict {
    /// Whether the caller must drop the message.
    pub fn is_rejected(&self) -> bool {
        !matches!(self, Self::Accepted)
    }
}

impl fmt::Display for ReplayVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::RejectedExpired { age } => write!(f, "expired ({age}s old)"),
            Self::RejectedFuture { ahead } => write!(f, "from the future ({ahead}s ahead)"),
            Self::RejectedDuplicate => write!(f, "duplicate"),
        }
    }
}

/// Replay guard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStatistics {
    /// Fingerprints currently tracked
    pub tracked: usize,
    /// Hard cap on tracked fingerprints
    pub max_entries: usize,
    /// Messages accepted
    pub accepted: u64,
    /// Messages rejected as expired
    pub rejected_expired: u64,
    /// Messages rejected as from the future
    pub rejected_future: u64,
    /// Messages rejected as duplicates
    pub rejected_duplicate: u64,
    /// Fingerprints removed by age sweeps
    pub swept: u64,
    /// Fingerprints dropped to enforce the hard cap
    pub forced_evictions: u64,
}

#[derive(Debug, Default)]
struct ReplayState {
    seen: HashMap<String, MessageFingerprint>,
    /// (timestamp, unique_id), oldest first
    by_age: BTreeSet<(u32, String)>,
    stats: ReplayStatistics,
}

impl ReplayState {
    fn insert(&mut self, key: String, fingerprint: MessageFingerprint) {
        self.by_age.insert((fingerprint.timestamp, key.clone()));
        self.seen.insert(key, fingerprint);
    }

    fn oldest_timestamp(&self) -> Option<u32> {
        self.by_age.first().map(|(timestamp, _)| *timestamp)
    }

    fn pop_oldest(&mut self) -> Option<MessageFingerprint> {
        let (_, key) = self.by_age.pop_first()?;
        self.seen.remove(&key)
    }
}

/// Timestamp window and seen-set replay protection.
pub struct ReplayGuard {
    config: ReplayConfig,
    clock: SharedClock,
    state: RwLock<ReplayState>,
}

impl ReplayGuard {
    /// Create a guard reading time from `clock`.
    pub fn new(config: ReplayConfig, clock: SharedClock) -> Self {
        let state = ReplayState {
            stats: ReplayStatistics {
                max_entries: config.max_entries,
                ..ReplayStatistics::default()
            },
            ..ReplayState::default()
        };
        Self {
            config,
            clock,
            state: RwLock::new(state),
        }
    }

    /// Returns `true` if the message is a replay or otherwise invalid and must be dropped.
    ///
    /// Internal failures count as replays.
    pub fn check(&self, message_id: &str, sender_id: &str, timestamp: u32, content: &[u8]) -> bool {
        self.check_fingerprint(&MessageFingerprint::new(message_id, sender_id, timestamp, content))
    }

    /// [`check`](Self::check) for an existing fingerprint.
    pub fn check_fingerprint(&self, fingerprint: &MessageFingerprint) -> bool {
        match self.evaluate(fingerprint) {
            Ok(verdict) => verdict.is_rejected(),
            Err(e) => {
                tracing::error!(error = %e, "Replay guard failure, dropping message");
                true
            }
        }
    }

    /// Classify a fingerprint, recording it when accepted.
    pub fn evaluate(&self, fingerprint: &MessageFingerprint) -> GuardResult<ReplayVerdict> {
        let now = self.clock.now_secs();
        let timestamp = u64::from(fingerprint.timestamp);

        let verdict = if now.saturating_sub(timestamp) > self.config.time_window_secs {
            ReplayVerdict::RejectedExpired {
                age: now - timestamp,
            }
        } else if timestamp.saturating_sub(now) > self.config.clock_skew_secs {
            ReplayVerdict::RejectedFuture {
                ahead: timestamp - now,
            }
        } else {
            ReplayVerdict::Accepted
        };

        let mut state = self.write()?;
        let verdict = match verdict {
            ReplayVerdict::Accepted => {
                let key = fingerprint.unique_id();
                if state.seen.contains_key(&key) {
                    ReplayVerdict::RejectedDuplicate
                } else {
                    state.insert(key, fingerprint.clone());
                    if state.seen.len() > self.config.max_entries {
                        self.enforce_cap(&mut state, now);
                    }
                    ReplayVerdict::Accepted
                }
            }
            rejected => rejected,
        };

        match verdict {
            ReplayVerdict::Accepted => state.stats.accepted += 1,
            ReplayVerdict::RejectedExpired { .. } => state.stats.rejected_expired += 1,
            ReplayVerdict::RejectedFuture { .. } => state.stats.rejected_future += 1,
            ReplayVerdict::RejectedDuplicate => state.stats.rejected_duplicate += 1,
        }
        drop(state);

        if verdict.is_rejected() {
            tracing::debug!(
                sender_id = %fingerprint.sender_id,
                message_id = %fingerprint.message_id,
                verdict = %verdict,
                "Replay guard rejected message"
            );
        }
        Ok(verdict)
    }

    /// Remove fingerprints older than the window. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_secs();
        match self.write() {
            Ok(mut state) => self.sweep_locked(&mut state, now),
            Err(e) => {
                tracing::error!(error = %e, "Replay sweep skipped");
                0
            }
        }
    }

    /// Number of fingerprints currently tracked.
    pub fn tracked(&self) -> usize {
        self.state.read().map(|state| state.seen.len()).unwrap_or(0)
    }

    /// Counter snapshot.
    pub fn statistics(&self) -> GuardResult<ReplayStatistics> {
        let state = self
            .state
            .read()
            .map_err(|_| GuardError::Internal("replay guard lock poisoned".into()))?;
        Ok(ReplayStatistics {
            tracked: state.seen.len(),
            ..state.stats.clone()
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    fn write(&self) -> GuardResult<RwLockWriteGuard<'_, ReplayState>> {
        self.state
            .write()
            .map_err(|_| GuardError::Internal("replay guard lock poisoned".into()))
    }

    fn sweep_locked(&self, state: &mut ReplayState, now: u64) -> usize {
        let window = self.config.time_window_secs;
        let mut removed = 0;
        while let Some(timestamp) = state.oldest_timestamp() {
            if now.saturating_sub(u64::from(timestamp)) <= window {
                break;
            }
            state.pop_oldest();
            removed += 1;
        }
        state.stats.swept += removed as u64;
        if removed > 0 {
            tracing::debug!(removed, remaining = state.seen.len(), "Replay guard swept expired fingerprints");
        }
        removed
    }

    fn enforce_cap(&self, state: &mut ReplayState, now: u64) {
        self.sweep_locked(state, now);

        let mut dropped = 0;
        while state.seen.len() > self.config.max_entries && state.pop_oldest().is_some() {
            dropped += 1;
        }
        if dropped == 0 {
            return;
        }
        state.stats.forced_evictions += dropped as u64;

        tracing::warn!(
            dropped,
            max_entries = self.config.max_entries,
            "Replay guard over capacity, dropped oldest fingerprints"
        );
    }
}

impl Sweep for ReplayGuard {
    fn sweep(&self) -> usize {
        ReplayGuard::sweep(self)
    }

    fn name(&self) -> &'static str {
        "replay_guard"
    }
}
