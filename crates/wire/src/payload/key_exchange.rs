//! Session key exchange payloads.
//!
//! ```text
//! request:  [sender_id:str8][retry_count:1][key_len:2 LE][public_key]
//! response: [sender_id:str8][status:1][key_len:2 LE][public_key][error:str8]
//! ```
//!
//! The key material itself is opaque here; negotiation happens in the
//! encryption collaborator.

use serde::{Deserialize, Serialize};

use super::MAX_PEER_ID_LEN;
use crate::buf::{put_body16, put_str8, Reader};
use crate::error::{DecodeError, DecodeResult};

/// Maximum length of a public key blob.
pub const MAX_PUBLIC_KEY_LEN: usize = 256;

const MAX_ERROR_LEN: usize = 255;

/// Key exchange request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyExchangePayload {
    /// Identifier of the requesting peer
    pub sender_id: String,
    /// How many times this request has been retried
    pub retry_count: u8,
    /// Sender's public key
    pub public_key: Vec<u8>,
}

impl KeyExchangePayload {
    /// Encode to payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.sender_id.len() + self.public_key.len());
        put_str8(&mut buf, &self.sender_id, MAX_PEER_ID_LEN);
        buf.push(self.retry_count);
        put_body16(&mut buf, &self.public_key, MAX_PUBLIC_KEY_LEN);
        buf
    }

    /// Decode from payload bytes.
    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut reader = Reader::new(data);
        let sender_id = reader.str8("sender_id", MAX_PEER_ID_LEN)?;
        let retry_count = reader.u8()?;
        let public_key = reader.body16("public_key", MAX_PUBLIC_KEY_LEN)?;
        reader.finish()?;
        Ok(Self {
            sender_id,
            retry_count,
            public_key,
        })
    }
}

/// Outcome reported by a key exchange response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyExchangeStatus {
    /// Key accepted, session established
    Success = 0,
    /// Peer refused the exchange
    Rejected = 1,
    /// Peer failed to process the request
    Error = 2,
}

impl KeyExchangeStatus {
    /// Convert from raw byte value.
    pub fn from_byte(b: u8) -> DecodeResult<Self> {
        match b {
            0 => Ok(Self::Success),
            1 => Ok(Self::Rejected),
            2 => Ok(Self::Error),
            value => Err(DecodeError::InvalidValue {
                field: "key_exchange_status",
                value,
            }),
        }
    }
}

/// Key exchange response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyExchangeResponsePayload {
    /// Identifier of the responding peer
    pub sender_id: String,
    /// Outcome
    pub status: KeyExchangeStatus,
    /// Responder's public key (empty unless `status` is success)
    pub public_key: Vec<u8>,
    /// Failure description, if any
    pub error: Option<String>,
}

impl KeyExchangeResponsePayload {
    /// Encode to payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.sender_id.len() + self.public_key.len());
        put_str8(&mut buf, &self.sender_id, MAX_PEER_ID_LEN);
        buf.push(self.status as u8);
        put_body16(&mut buf, &self.public_key, MAX_PUBLIC_KEY_LEN);
        put_str8(&mut buf, self.error.as_deref().unwrap_or_default(), MAX_ERROR_LEN);
        buf
    }

    /// Decode from payload bytes.
    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut reader = Reader::new(data);
        let sender_id = reader.str8("sender_id", MAX_PEER_ID_LEN)?;
        let status = KeyExchangeStatus::from_byte(reader.u8()?)?;
        let public_key = reader.body16("public_key", MAX_PUBLIC_KEY_LEN)?;
        let error = reader.str8("error", MAX_ERROR_LEN)?;
        reader.finish()?;
        Ok(Self {
            sender_id,
            status,
            public_key,
            error: (!error.is_empty()).then_some(error),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_request() {
        let request = KeyExchangePayload {
            sender_id: "peerA".to_string(),
            retry_count: 2,
            public_key: vec![0x11; 32],
        };
        assert_eq!(KeyExchangePayload::decode(&request.encode()).unwrap(), request);
    }

    #[test]
    fn roundtrip_rejected_response() {
        let response = KeyExchangeResponsePayload {
            sender_id: "peerB".to_string(),
            status: KeyExchangeStatus::Rejected,
            public_key: vec![],
            error: Some("session limit reached".to_string()),
        };
        assert_eq!(
            KeyExchangeResponsePayload::decode(&response.encode()).unwrap(),
            response
        );
    }

    #[test]
    fn oversized_key_declaration_rejected() {
        let mut bytes = vec![1, b'a', 0];
        bytes.extend_from_slice(&1000u16.to_le_bytes());
        bytes.extend_from_slice(&[0; 1000]);
        assert!(matches!(
            KeyExchangePayload::decode(&bytes),
            Err(DecodeError::UnknownFieldLength { field: "public_key", .. })
        ));
    }

    #[test]
    fn unknown_status_rejected() {
        let bytes = [1, b'a', 7, 0, 0, 0];
        assert!(matches!(
            KeyExchangeResponsePayload::decode(&bytes),
            Err(DecodeError::InvalidValue { value: 7, .. })
        ));
    }
}
