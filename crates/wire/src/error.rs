//! Error types for SignalAir wire operations.
//!
//! Every error in this module is local to a single frame: the caller drops the
//! offending message and carries on with the rest of the traffic.

use thiserror::Error;

use crate::kind::MessageKind;

/// Errors produced while turning untrusted bytes into a frame or payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ended before a field could be read
    #[error("Truncated input: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required by the next field
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// The version byte is not one this build understands
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// A length field declares more than its field allows
    #[error("Length field `{field}` declares {declared} (max {max})")]
    UnknownFieldLength {
        /// Name of the length-prefixed field
        field: &'static str,
        /// Declared length
        declared: usize,
        /// Ceiling for this field
        max: usize,
    },

    /// A string field is not valid UTF-8
    #[error("Field `{field}` is not valid UTF-8")]
    InvalidUtf8 {
        /// Name of the string field
        field: &'static str,
    },

    /// An enumerated field carries a value with no meaning
    #[error("Invalid value {value:#04x} for field `{field}`")]
    InvalidValue {
        /// Name of the enumerated field
        field: &'static str,
        /// Raw byte found on the wire
        value: u8,
    },

    /// A game field map repeats a key
    #[error("Duplicate game field key: {0}")]
    DuplicateKey(String),

    /// Nested game fields go deeper than allowed
    #[error("Nested game fields exceed depth {max}")]
    NestingTooDeep {
        /// Maximum nesting depth
        max: usize,
    },

    /// Bytes remain after the last declared field
    #[error("{0} trailing bytes after final field")]
    TrailingBytes(usize),
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors produced by the schema validator for a decoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Frame version is not supported
    #[error("Invalid protocol version: {0}")]
    InvalidVersion(u8),

    /// Frame kind is not a known message kind
    #[error("Invalid message kind: {0:#04x}")]
    InvalidKind(u8),

    /// Payload exceeds the ceiling declared by its kind
    #[error("Payload too large for {kind}: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Message kind
        kind: MessageKind,
        /// Actual payload size
        size: usize,
        /// Ceiling for the kind
        max: usize,
    },

    /// Timestamp is further from the local clock than allowed
    #[error("Timestamp {timestamp} out of range (now {now}, max drift {max_drift}s)")]
    TimestampOutOfRange {
        /// Timestamp carried by the frame or payload
        timestamp: u32,
        /// Local clock reading
        now: u64,
        /// Drift bound that was applied
        max_drift: u64,
    },

    /// Kind-specific payload structure is broken
    #[error("Malformed {kind} payload: {reason}")]
    MalformedSubstructure {
        /// Message kind
        kind: MessageKind,
        /// What was wrong
        reason: String,
    },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Errors surfaced by a [`SessionCipher`](crate::cipher::SessionCipher) implementation.
#[derive(Debug, Error)]
pub enum CipherError {
    /// No session key has been negotiated with the peer
    #[error("No session key for peer {0}")]
    NoSession(String),

    /// The cipher rejected the input
    #[error("Cipher failure: {0}")]
    Failed(String),
}
