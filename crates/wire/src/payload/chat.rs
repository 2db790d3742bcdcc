//! Chat message payload.
//!
//! ```text
//! [message_id:16][timestamp:4 LE][sender_name:str8][flags:1][text_len:2 LE][text]
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MAX_DISPLAY_NAME_LEN;
use crate::buf::{put_body16, put_str8, Reader};
use crate::error::{DecodeError, DecodeResult};

/// Declared maximum length of a chat message body.
pub const MAX_CHAT_TEXT_LEN: usize = 1024;

const FLAG_ENCRYPTED: u8 = 0x01;

/// Decoded chat payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Chat message identifier
    pub message_id: Uuid,
    /// Sender clock when the message was written (unix seconds)
    pub timestamp: u32,
    /// Display name of the sender
    pub sender_name: String,
    /// Whether `text` is ciphertext
    pub encrypted: bool,
    /// Message body
    pub text: Vec<u8>,
}

impl ChatPayload {
    /// Encode to payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(24 + self.sender_name.len() + self.text.len());
        buf.extend_from_slice(self.message_id.as_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        put_str8(&mut buf, &self.sender_name, MAX_DISPLAY_NAME_LEN);
        buf.push(if self.encrypted { FLAG_ENCRYPTED } else { 0 });
        put_body16(&mut buf, &self.text, MAX_CHAT_TEXT_LEN);
        buf
    }

    /// Decode from payload bytes.
    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut reader = Reader::new(data);
        let (message_id, timestamp, sender_name, flags) = read_header(&mut reader)?;
        let text = reader.body16("chat_text", MAX_CHAT_TEXT_LEN)?;
        reader.finish()?;

        Ok(Self {
            message_id,
            timestamp,
            sender_name,
            encrypted: flags & FLAG_ENCRYPTED != 0,
            text,
        })
    }

    /// Read the body length field without reading the body itself.
    ///
    /// The validator uses this to reject oversized declarations before any
    /// body bytes are touched.
    pub fn declared_text_len(data: &[u8]) -> DecodeResult<usize> {
        let mut reader = Reader::new(data);
        read_header(&mut reader)?;
        Ok(reader.u16_le()? as usize)
    }
}

fn read_header(reader: &mut Reader<'_>) -> DecodeResult<(Uuid, u32, String, u8)> {
    let message_id = reader.uuid()?;
    let timestamp = reader.u32_le()?;
    let sender_name = reader.str8("sender_name", MAX_DISPLAY_NAME_LEN)?;
    let flags = reader.u8()?;
    if flags & !FLAG_ENCRYPTED != 0 {
        return Err(DecodeError::InvalidValue {
            field: "chat_flags",
            value: flags,
        });
    }
    Ok((message_id, timestamp, sender_name, flags))
}
