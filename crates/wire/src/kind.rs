//! Message kinds and their per-kind limits.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ABSOLUTE_MAX_PAYLOAD;

/// Kind byte carried in every frame header.
///
/// Byte values are fixed by the wire format:
/// - `0x01`: Signal (distress/status beacons)
/// - `0x02`: Chat
/// - `0x03`: Game state
/// - `0x04`: System notices
/// - `0x05`/`0x06`: Key exchange request/response
/// - `0x07`: Heartbeat
/// - `0x08`: Topology
///
/// Any other byte decodes to [`MessageKind::Unknown`] so that newer peers do
/// not break older ones; the validator rejects it before it reaches
/// application code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Emergency signal beacon
    Signal,
    /// Chat message
    Chat,
    /// Mini-game state update
    Game,
    /// System notice
    System,
    /// Session key exchange request
    KeyExchange,
    /// Session key exchange response
    KeyExchangeResponse,
    /// Liveness heartbeat
    Heartbeat,
    /// Mesh topology advertisement
    Topology,
    /// Kind byte this build does not recognise
    Unknown(u8),
}

impl MessageKind {
    /// All kinds this build understands.
    pub const KNOWN: [MessageKind; 8] = [
        MessageKind::Signal,
        MessageKind::Chat,
        MessageKind::Game,
        MessageKind::System,
        MessageKind::KeyExchange,
        MessageKind::KeyExchangeResponse,
        MessageKind::Heartbeat,
        MessageKind::Topology,
    ];

    /// Convert from raw byte value.
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x01 => Self::Signal,
            0x02 => Self::Chat,
            0x03 => Self::Game,
            0x04 => Self::System,
            0x05 => Self::KeyExchange,
            0x06 => Self::KeyExchangeResponse,
            0x07 => Self::Heartbeat,
            0x08 => Self::Topology,
            other => Self::Unknown(other),
        }
    }

    /// Raw byte written to the wire.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Signal => 0x01,
            Self::Chat => 0x02,
            Self::Game => 0x03,
            Self::System => 0x04,
            Self::KeyExchange => 0x05,
            Self::KeyExchangeResponse => 0x06,
            Self::Heartbeat => 0x07,
            Self::Topology => 0x08,
            Self::Unknown(b) => b,
        }
    }

    /// Whether this kind is one the validator will accept.
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Payload ceiling in bytes.
    pub fn max_payload(self) -> usize {
        match self {
            Self::Signal => 1024,
            Self::Chat => 2 * 1024,
            Self::Game => 4 * 1024,
            Self::System => 512,
            Self::KeyExchange | Self::KeyExchangeResponse => 1024,
            Self::Heartbeat => 512,
            Self::Topology => 8 * 1024,
            Self::Unknown(_) => ABSOLUTE_MAX_PAYLOAD,
        }
    }

    /// Kind-specific clock drift bound, tighter than the envelope default.
    pub fn max_clock_drift(self) -> Option<u64> {
        match self {
            // Heartbeats are only meaningful while fresh
            Self::Heartbeat => Some(300),
            _ => None,
        }
    }

    /// Whether the payload travels encrypted with the peer session key.
    pub fn is_confidential(self) -> bool {
        matches!(self, Self::Signal | Self::Chat)
    }

    /// Stable lower-case name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Chat => "chat",
            Self::Game => "game",
            Self::System => "system",
            Self::KeyExchange => "key_exchange",
            Self::KeyExchangeResponse => "key_exchange_response",
            Self::Heartbeat => "heartbeat",
            Self::Topology => "topology",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(b) => write!(f, "unknown({b:#04x})"),
            other => f.write_str(other.name()),
        }
    }
}
