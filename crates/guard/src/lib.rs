//! SignalAir Guard - Defense layer for inbound mesh traffic
//!
//! Stateful filtering between the wire codec and the application:
//!
//! - **Fingerprint Engine**: stable (sender, id, content hash) identity per message
//! - **Bounded LRU Cache**: generic O(1) cache backing the deduplicator
//! - **Rate Limiter**: per-second and per-minute admission control
//! - **Replay Guard**: timestamp window plus seen-set
//! - **Deduplicator**: time-windowed LRU filter with fail-safe paths
//! - **Inbound Pipeline**: decode → validate → fingerprint → admit → replay → dedup
//!
//! Every component is an explicit instance built from [`DefenseConfig`] and a
//! [`Clock`]; nothing here is global. Request-path operations are synchronous
//! and hold one lock per component operation. Periodic sweeps run on tokio.
//!
//! # Example Usage
//!
//! ```rust
//! use signalair_guard::{DefenseConfig, InboundPipeline, ManualClock, Rejection};
//! use signalair_wire::{MeshMessage, MessageKind};
//!
//! let clock = ManualClock::new(1_700_000_000);
//! let pipeline = InboundPipeline::new(DefenseConfig::default(), clock.shared());
//!
//! let bytes = MeshMessage::with_id("abc-123", MessageKind::System, b"hello".to_vec())
//!     .encode(1_700_000_000);
//!
//! assert!(pipeline.process("peerA", &bytes).is_ok());
//! assert!(matches!(pipeline.process("peerA", &bytes), Err(Rejection::Replay(_))));
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod lru;
pub mod pipeline;
pub mod rate_limit;
pub mod replay;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{DedupConfig, DefenseConfig, RateLimitConfig, ReplayConfig};
pub use dedup::{CacheHealth, DedupStatistics, Deduplicator};
pub use error::{ConfigError, GuardError, GuardResult, Rejection};
pub use fingerprint::{content_hash, MessageFingerprint};
pub use lru::LruCache;
pub use pipeline::{AcceptedMessage, InboundPipeline, PipelineStatistics};
pub use rate_limit::{RateLimiter, RateLimiterStatistics, RateWindow};
pub use replay::{ReplayGuard, ReplayStatistics, ReplayVerdict};
pub use sweeper::{Sweep, Sweeper, SweeperHandle};
