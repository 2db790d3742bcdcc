//! Outer frame envelope shared by every message kind.
//!
//! Layout on the wire (all integers little-endian):
//!
//! ```text
//! [version:1][kind:1][id_len:1][id:id_len][payload_len:4][timestamp:4][payload:payload_len]
//! ```
//!
//! Encoding never fails: oversized ids are truncated and payloads are capped
//! at the kind's ceiling, and the declared lengths always match the bytes
//! that follow. Decoding treats the buffer as hostile and checks every length
//! against the bytes that remain before slicing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::buf::{check_len, truncate_utf8, Reader};
use crate::error::{DecodeError, DecodeResult};
use crate::kind::MessageKind;
use crate::{ABSOLUTE_MAX_PAYLOAD, ENVELOPE_OVERHEAD, MAX_MESSAGE_ID_LEN, PROTOCOL_VERSION};

/// Application-level message handed to the codec for sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshMessage {
    /// Message identifier (UUID-like, at most 64 bytes on the wire)
    pub id: String,
    /// Message kind
    pub kind: MessageKind,
    /// Encoded kind substructure; body fields of confidential kinds are ciphertext
    pub payload: Vec<u8>,
}

impl MeshMessage {
    /// Create a new message with a random UUID identifier.
    pub fn new(kind: MessageKind, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
        }
    }

    /// Create a message with a caller-chosen identifier.
    pub fn with_id(id: impl Into<String>, kind: MessageKind, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
        }
    }

    /// Encode to wire format bytes stamped with `timestamp`.
    pub fn encode(&self, timestamp: u32) -> Vec<u8> {
        encode(self, timestamp)
    }
}

/// Decoded on-wire representation of a message.
///
/// `id_len` and `payload_len` are not stored: they are always derived from
/// `id` and `payload`, which keeps the header consistent by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFrame {
    /// Protocol version byte
    pub version: u8,
    /// Message kind
    pub kind: MessageKind,
    /// Message identifier
    pub id: String,
    /// Sender clock at encode time (unix seconds)
    pub timestamp: u32,
    /// Payload bytes
    pub payload: Vec<u8>,
}

impl WireFrame {
    /// Length of the id as written in the header.
    pub fn id_len(&self) -> usize {
        self.id.len()
    }

    /// Length of the payload as written in the header.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Total encoded size of this frame.
    pub fn encoded_len(&self) -> usize {
        ENVELOPE_OVERHEAD + self.id.len() + self.payload.len()
    }

    /// Decode from wire format bytes.
    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        decode(data)
    }

    /// Encode back to wire format bytes.
    pub fn encode(&self) -> Vec<u8> {
        write_frame(self.version, self.kind, &self.id, self.timestamp, &self.payload)
    }

    /// Drop the envelope metadata and keep the application message.
    pub fn into_message(self) -> MeshMessage {
        MeshMessage {
            id: self.id,
            kind: self.kind,
            payload: self.payload,
        }
    }
}

/// Encode `message` into a version-1 frame stamped with `timestamp`.
pub fn encode(message: &MeshMessage, timestamp: u32) -> Vec<u8> {
    let id = truncate_utf8(&message.id, MAX_MESSAGE_ID_LEN);
    let max_payload = message.kind.max_payload();
    let payload = if message.payload.len() > max_payload {
        tracing::warn!(
            kind = %message.kind,
            payload_len = message.payload.len(),
            max_payload,
            "Outbound payload exceeds kind ceiling, capping"
        );
        &message.payload[..max_payload]
    } else {
        &message.payload[..]
    };

    write_frame(PROTOCOL_VERSION, message.kind, id, timestamp, payload)
}

fn write_frame(version: u8, kind: MessageKind, id: &str, timestamp: u32, payload: &[u8]) -> Vec<u8> {
    let id = truncate_utf8(id, MAX_MESSAGE_ID_LEN);
    let payload = &payload[..payload.len().min(ABSOLUTE_MAX_PAYLOAD)];

    let mut buf = Vec::with_capacity(ENVELOPE_OVERHEAD + id.len() + payload.len());
    buf.push(version);
    buf.push(kind.to_byte());
    buf.push(id.len() as u8);
    buf.extend_from_slice(id.as_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&timestamp.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Decode a frame from untrusted bytes.
///
/// The version byte is checked before anything else is interpreted. Unknown
/// kind bytes decode to [`MessageKind::Unknown`].
///
/// # Errors
///
/// - [`DecodeError::Truncated`] if any field runs past the end of `data`
/// - [`DecodeError::UnsupportedVersion`] if the version byte is not 1
/// - [`DecodeError::UnknownFieldLength`] if `id_len` or `payload_len` exceed their ceilings
/// - [`DecodeError::InvalidUtf8`] if the id is not UTF-8
/// - [`DecodeError::TrailingBytes`] if bytes follow the payload
pub fn decode(data: &[u8]) -> DecodeResult<WireFrame> {
    let mut reader = Reader::new(data);

    let version = reader.u8()?;
    if version != PROTOCOL_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let kind = MessageKind::from_byte(reader.u8()?);

    let id_len = reader.u8()? as usize;
    check_len("id", id_len, MAX_MESSAGE_ID_LEN)?;
    let id = std::str::from_utf8(reader.take(id_len)?)
        .map_err(|_| DecodeError::InvalidUtf8 { field: "id" })?
        .to_owned();

    let payload_len = reader.u32_le()? as usize;
    check_len("payload", payload_len, ABSOLUTE_MAX_PAYLOAD)?;

    let timestamp = reader.u32_le()?;
    let payload = reader.take(payload_len)?.to_vec();
    reader.finish()?;

    Ok(WireFrame {
        version,
        kind,
        id,
        timestamp,
        payload,
    })
}
