//! SignalAir Wire - Binary frame protocol for the offline mesh
//!
//! Encodes and decodes the versioned frame format exchanged between devices
//! over the ad-hoc mesh transport, and validates decoded frames before any of
//! their contents are trusted.
//!
//! # Core Components
//!
//! - **Frame Codec**: outer envelope shared by every message kind
//! - **Payload Codecs**: per-kind substructures (signal, chat, key exchange, game, control)
//! - **Schema Validator**: version, kind, size, clock drift and substructure checks
//! - **Session Cipher**: narrow interface to the external encryption collaborator
//!
//! # Design Principles
//!
//! 1. **Untrusted Input**: every length field is bounds-checked before slicing
//! 2. **Stateless**: nothing in this crate needs synchronization
//! 3. **Forward Compatible**: unknown kinds decode to a sentinel instead of failing
//!
//! # Example Usage
//!
//! ```rust
//! use signalair_wire::{decode, MeshMessage, MessageKind, SchemaValidator};
//!
//! let message = MeshMessage::with_id("abc-123", MessageKind::System, b"mesh online".to_vec());
//! let bytes = message.encode(1_700_000_000);
//!
//! let frame = decode(&bytes).expect("well-formed frame");
//! SchemaValidator::default()
//!     .validate(&frame, 1_700_000_010)
//!     .expect("frame passes validation");
//! assert_eq!(frame.into_message(), message);
//! ```

#![warn(missing_docs)]

mod buf;
pub mod cipher;
pub mod error;
pub mod frame;
pub mod kind;
pub mod payload;
pub mod validation;

// Re-export main types
pub use cipher::{open_payload, seal_payload, SessionCipher};
pub use error::{CipherError, DecodeError, DecodeResult, ValidationError, ValidationResult};
pub use frame::{decode, encode, MeshMessage, WireFrame};
pub use kind::MessageKind;
pub use payload::{
    ChatPayload, GameFields, GameMessage, GameValue, HeartbeatPayload, KeyExchangePayload,
    KeyExchangeResponsePayload, KeyExchangeStatus, SignalPayload, SignalType, TopologyPayload,
};
pub use validation::{SchemaValidator, ValidatorConfig};

/// The only protocol version this build speaks.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum encoded length of a message id, in bytes.
pub const MAX_MESSAGE_ID_LEN: usize = 64;

/// Largest payload any frame may declare, regardless of kind.
pub const ABSOLUTE_MAX_PAYLOAD: usize = 8 * 1024;

/// Fixed envelope bytes excluding the id: version, kind, id_len, payload_len, timestamp.
pub const ENVELOPE_OVERHEAD: usize = 1 + 1 + 1 + 4 + 4;
