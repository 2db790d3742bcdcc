//! Kind-specific payload substructures.
//!
//! Each codec follows the same contract as the frame envelope: `encode` never
//! fails (strings are truncated on a char boundary, bodies and lists are
//! capped) and `decode` bounds-checks every read and rejects trailing bytes.
//!
//! Strings are prefixed with a single length byte. Variable bodies carry a
//! `u16` little-endian length. Fixed counters in the control payloads are
//! big-endian, matching what deployed peers already emit.

pub mod chat;
pub mod control;
pub mod game;
pub mod key_exchange;
pub mod signal;

pub use chat::{ChatPayload, MAX_CHAT_TEXT_LEN};
pub use control::{HeartbeatPayload, TopologyPayload, MAX_TOPOLOGY_NEIGHBORS};
pub use game::{GameFields, GameMessage, GameValue, MAX_GAME_NESTING};
pub use key_exchange::{
    KeyExchangePayload, KeyExchangeResponsePayload, KeyExchangeStatus, MAX_PUBLIC_KEY_LEN,
};
pub use signal::{SignalPayload, SignalType, MAX_SIGNAL_BODY_LEN};

/// Maximum length of a peer or node identifier inside a payload.
pub const MAX_PEER_ID_LEN: usize = 64;

/// Maximum length of a human-readable device or sender name.
pub const MAX_DISPLAY_NAME_LEN: usize = 64;
