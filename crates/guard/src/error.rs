//! Error types for the SignalAir defense layer.

use signalair_wire::{DecodeError, ValidationError};
use thiserror::Error;

use crate::rate_limit::RateWindow;
use crate::replay::ReplayVerdict;

/// Errors raised by the stateful defense components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// Admission control refused the call; use the fail-safe path, do not retry
    #[error("Rate limit exceeded: more than {limit} checks per {window}")]
    RateLimitExceeded {
        /// Window that tripped
        window: RateWindow,
        /// Ceiling for that window
        limit: u32,
    },

    /// Too many consecutive internal errors; back off the whole pipeline briefly
    #[error("System overload after {consecutive_errors} consecutive internal errors")]
    SystemOverload {
        /// Internal errors since the last successful cache operation
        consecutive_errors: u32,
    },

    /// Internal failure such as a poisoned lock
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for defense operations.
pub type GuardResult<T> = Result<T, GuardError>;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML could not be parsed into the configuration structs
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A capacity, window or ceiling is zero
    #[error("Invalid configuration: `{field}` must be non-zero")]
    ZeroValue {
        /// Dotted path of the offending field
        field: &'static str,
    },

    /// Fields are individually valid but inconsistent with each other
    #[error("Invalid configuration: {0}")]
    Inconsistent(String),
}

/// Why the inbound pipeline dropped a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Bytes did not form a frame
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Frame failed schema validation
    #[error("Validation failed: {0}")]
    Invalid(#[from] ValidationError),

    /// Replay guard refused the message
    #[error("Replay guard: {0}")]
    Replay(ReplayVerdict),

    /// Content already processed within the dedup window
    #[error("Duplicate message")]
    Duplicate,

    /// Defense layer is overloaded; pause processing
    #[error("Defense layer overloaded after {consecutive_errors} consecutive internal errors")]
    Overloaded {
        /// Internal errors since the last successful cache operation
        consecutive_errors: u32,
    },

    /// Internal failure inside a defense component
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Rejection {
    /// Short label for logs and counters.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Invalid(_) => "invalid",
            Self::Replay(_) => "replay",
            Self::Duplicate => "duplicate",
            Self::Overloaded { .. } => "overloaded",
            Self::Internal(_) => "internal",
        }
    }
}
