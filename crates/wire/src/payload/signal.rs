//! Emergency signal payload.
//!
//! ```text
//! [signal_id:16][signal_type:1][timestamp:4 LE][sequence:4 BE]
//! [device_name:str8][grid_code:str8][body_len:2 LE][body]
//! ```
//!
//! An empty grid code means the sender had no location fix.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MAX_DISPLAY_NAME_LEN;
use crate::buf::{put_body16, put_str8, Reader};
use crate::error::{DecodeError, DecodeResult};

/// Maximum length of the grid code carried with a signal.
pub const MAX_GRID_CODE_LEN: usize = 32;

/// Maximum length of the (usually encrypted) signal body.
pub const MAX_SIGNAL_BODY_LEN: usize = 512;

/// What the sender is signalling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignalType {
    /// Sender is safe
    Safe = 0,
    /// Sender needs supplies
    Supplies = 1,
    /// Sender needs medical help
    Medical = 2,
    /// Sender reports danger nearby
    Danger = 3,
}

impl SignalType {
    /// Convert from raw byte value.
    pub fn from_byte(b: u8) -> DecodeResult<Self> {
        match b {
            0 => Ok(Self::Safe),
            1 => Ok(Self::Supplies),
            2 => Ok(Self::Medical),
            3 => Ok(Self::Danger),
            value => Err(DecodeError::InvalidValue {
                field: "signal_type",
                value,
            }),
        }
    }
}

/// Decoded signal payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPayload {
    /// Signal identifier
    pub signal_id: Uuid,
    /// Signal type
    pub signal_type: SignalType,
    /// Sender clock when the signal was raised (unix seconds)
    pub timestamp: u32,
    /// Per-device sequence counter (big-endian on the wire)
    pub sequence: u32,
    /// Human-readable device name
    pub device_name: String,
    /// Coarse location grid code, if known
    pub grid_code: Option<String>,
    /// Signal body
    pub body: Vec<u8>,
}

impl SignalPayload {
    /// Encode to payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + self.device_name.len() + self.body.len());
        buf.extend_from_slice(self.signal_id.as_bytes());
        buf.push(self.signal_type as u8);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_be_bytes());
        put_str8(&mut buf, &self.device_name, MAX_DISPLAY_NAME_LEN);
        put_str8(
            &mut buf,
            self.grid_code.as_deref().unwrap_or_default(),
            MAX_GRID_CODE_LEN,
        );
        put_body16(&mut buf, &self.body, MAX_SIGNAL_BODY_LEN);
        buf
    }

    /// Decode from payload bytes.
    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut reader = Reader::new(data);
        let signal_id = reader.uuid()?;
        let signal_type = SignalType::from_byte(reader.u8()?)?;
        let timestamp = reader.u32_le()?;
        let sequence = reader.u32_be()?;
        let device_name = reader.str8("device_name", MAX_DISPLAY_NAME_LEN)?;
        let grid_code = reader.str8("grid_code", MAX_GRID_CODE_LEN)?;
        let body = reader.body16("signal_body", MAX_SIGNAL_BODY_LEN)?;
        reader.finish()?;

        Ok(Self {
            signal_id,
            signal_type,
            timestamp,
            sequence,
            device_name,
            grid_code: (!grid_code.is_empty()).then_some(grid_code),
            body,
        })
    }
}
