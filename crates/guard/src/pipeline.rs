//! Inbound message pipeline.
//!
//! Wires the codec, validator and defense components into one call per
//! received packet:
//!
//! ```text
//! bytes → decode → validate → fingerprint → admission → replay guard → deduplicator → accepted
//! ```
//!
//! Each stage takes its own lock for the duration of a single operation; no
//! lock is held across stages, so unrelated peers never serialize on each
//! other's traffic.

use serde::{Deserialize, Serialize};
use signalair_wire::{decode, encode, MeshMessage, SchemaValidator, WireFrame};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::clock::SharedClock;
use crate::config::DefenseConfig;
use crate::dedup::{DedupStatistics, Deduplicator};
use crate::error::{GuardError, GuardResult, Rejection};
use crate::fingerprint::MessageFingerprint;
use crate::replay::{ReplayGuard, ReplayStatistics};
use crate::sweeper::{Sweeper, SweeperHandle};

/// A message that passed every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMessage {
    /// Transport-level sender
    pub sender_id: String,
    /// Decoded frame
    pub frame: WireFrame,
    /// Fingerprint used for replay and dedup
    pub fingerprint: MessageFingerprint,
    /// Admission control was refusing work; dedup used the read-only path
    pub rate_limited: bool,
}

impl AcceptedMessage {
    /// Application-level view of the message.
    pub fn into_message(self) -> MeshMessage {
        self.frame.into_message()
    }
}

/// Aggregated pipeline counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatistics {
    /// Messages accepted
    pub accepted: u64,
    /// Dropped: undecodable bytes
    pub rejected_decode: u64,
    /// Dropped: failed schema validation
    pub rejected_invalid: u64,
    /// Dropped: replay guard
    pub rejected_replay: u64,
    /// Dropped: deduplicator
    pub rejected_duplicate: u64,
    /// Dropped: defense layer overloaded
    pub rejected_overload: u64,
    /// Dropped: internal failure
    pub rejected_internal: u64,
    /// Replay guard snapshot
    pub replay: ReplayStatistics,
    /// Deduplicator snapshot
    pub dedup: DedupStatistics,
}

impl PipelineStatistics {
    /// Render as JSON for the host's observability surface.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    decode: AtomicU64,
    invalid: AtomicU64,
    replay: AtomicU64,
    duplicate: AtomicU64,
    overload: AtomicU64,
    internal: AtomicU64,
}

impl Counters {
    fn record(&self, rejection: &Rejection) {
        let counter = match rejection {
            Rejection::Decode(_) => &self.decode,
            Rejection::Invalid(_) => &self.invalid,
            Rejection::Replay(_) => &self.replay,
            Rejection::Duplicate => &self.duplicate,
            Rejection::Overloaded { .. } => &self.overload,
            Rejection::Internal(_) => &self.internal,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Decode, validate and filter inbound traffic.
pub struct InboundPipeline {
    config: DefenseConfig,
    clock: SharedClock,
    validator: SchemaValidator,
    replay: Arc<ReplayGuard>,
    dedup: Arc<Deduplicator>,
    counters: Counters,
}

impl InboundPipeline {
    /// Build every component from `config`.
    pub fn new(config: DefenseConfig, clock: SharedClock) -> Self {
        Self {
            validator: SchemaValidator::new(config.validator.clone()),
            replay: Arc::new(ReplayGuard::new(config.replay.clone(), clock.clone())),
            dedup: Arc::new(Deduplicator::new(config.dedup.clone(), clock.clone())),
            counters: Counters::default(),
            config,
            clock,
        }
    }

    /// Run one received packet through every stage.
    pub fn process(&self, sender_id: &str, bytes: &[u8]) -> Result<AcceptedMessage, Rejection> {
        match self.run(sender_id, bytes) {
            Ok(accepted) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    sender_id,
                    message_id = %accepted.frame.id,
                    kind = %accepted.frame.kind,
                    payload_len = accepted.frame.payload.len(),
                    rate_limited = accepted.rate_limited,
                    "Accepted inbound message"
                );
                Ok(accepted)
            }
            Err(rejection) => {
                self.counters.record(&rejection);
                match &rejection {
                    Rejection::Overloaded { .. } | Rejection::Internal(_) => {
                        tracing::error!(sender_id, reason = rejection.label(), error = %rejection, "Dropped inbound message")
                    }
                    _ => {
                        tracing::warn!(sender_id, reason = rejection.label(), error = %rejection, "Dropped inbound message")
                    }
                }
                Err(rejection)
            }
        }
    }

    fn run(&self, sender_id: &str, bytes: &[u8]) -> Result<AcceptedMessage, Rejection> {
        let frame = decode(bytes)?;
        self.validator.validate(&frame, self.clock.now_secs())?;

        let fingerprint = MessageFingerprint::new(&frame.id, sender_id, frame.timestamp, &frame.payload);

        let rate_limited = match self.dedup.admit() {
            Ok(()) => false,
            Err(GuardError::RateLimitExceeded { .. }) => true,
            Err(e) => return Err(guard_rejection(e)),
        };

        let verdict = self
            .replay
            .evaluate(&fingerprint)
            .map_err(|e| Rejection::Internal(e.to_string()))?;
        if verdict.is_rejected() {
            return Err(Rejection::Replay(verdict));
        }

        let duplicate = if rate_limited {
            self.dedup.conservative_check(&fingerprint)
        } else {
            self.dedup.check_fingerprint(&fingerprint).map_err(guard_rejection)?
        };
        if duplicate {
            return Err(Rejection::Duplicate);
        }

        Ok(AcceptedMessage {
            sender_id: sender_id.to_string(),
            frame,
            fingerprint,
            rate_limited,
        })
    }

    /// Encode an outbound message stamped with the current clock.
    pub fn encode_outbound(&self, message: &MeshMessage) -> Vec<u8> {
        let timestamp = u32::try_from(self.clock.now_secs()).unwrap_or(u32::MAX);
        encode(message, timestamp)
    }

    /// Start periodic sweeps for the replay guard and the deduplicator.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_sweepers(&self) -> Vec<SweeperHandle> {
        vec![
            Sweeper::spawn(self.replay.clone(), self.config.replay.sweep_interval()),
            Sweeper::spawn(self.dedup.clone(), self.config.dedup.sweep_interval()),
        ]
    }

    /// Counter snapshot across every component.
    pub fn statistics(&self) -> GuardResult<PipelineStatistics> {
        Ok(PipelineStatistics {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            rejected_decode: self.counters.decode.load(Ordering::Relaxed),
            rejected_invalid: self.counters.invalid.load(Ordering::Relaxed),
            rejected_replay: self.counters.replay.load(Ordering::Relaxed),
            rejected_duplicate: self.counters.duplicate.load(Ordering::Relaxed),
            rejected_overload: self.counters.overload.load(Ordering::Relaxed),
            rejected_internal: self.counters.internal.load(Ordering::Relaxed),
            replay: self.replay.statistics()?,
            dedup: self.dedup.statistics()?,
        })
    }

    /// Replay guard instance.
    pub fn replay_guard(&self) -> &Arc<ReplayGuard> {
        &self.replay
    }

    /// Deduplicator instance.
    pub fn deduplicator(&self) -> &Arc<Deduplicator> {
        &self.dedup
    }

    /// Schema validator instance.
    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    /// Active configuration.
    pub fn config(&self) -> &DefenseConfig {
        &self.config
    }
}

fn guard_rejection(error: GuardError) -> Rejection {
    match error {
        GuardError::SystemOverload { consecutive_errors } => Rejection::Overloaded { consecutive_errors },
        GuardError::Internal(reason) => Rejection::Internal(reason),
        refused @ GuardError::RateLimitExceeded { .. } => Rejection::Internal(refused.to_string()),
    }
}
