//! Mini-game state payload with a typed field model.
//!
//! ```text
//! [room_id:str8][sender_name:str8][event:str8][fields:map]
//! map   = [count:1] ([key:str8][tag:1][value])*count
//! value = String(0): str8 | Int(1): i64 LE | Bool(2): u8 | StringList(3): [count:1] str8* | Nested(4): map
//! ```
//!
//! The game rules live elsewhere; this module only moves typed values across
//! the wire. Callers keep the encoded size under the game ceiling (4 KiB);
//! anything larger is capped by the frame codec and then fails validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{MAX_DISPLAY_NAME_LEN, MAX_PEER_ID_LEN};
use crate::buf::{put_str8, Reader};
use crate::error::{DecodeError, DecodeResult};

/// Deepest allowed nesting of field maps (the top-level map is depth 1).
pub const MAX_GAME_NESTING: usize = 4;

const MAX_STR: usize = u8::MAX as usize;
const MAX_ENTRIES: usize = u8::MAX as usize;

const TAG_STRING: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_STRING_LIST: u8 = 3;
const TAG_NESTED: u8 = 4;

/// Field map carried by a game message. Ordered so encoding is deterministic.
pub type GameFields = BTreeMap<String, GameValue>;

/// A single typed game field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameValue {
    /// UTF-8 string (at most 255 bytes)
    String(String),
    /// Signed integer
    Int(i64),
    /// Boolean
    Bool(bool),
    /// List of strings (at most 255 entries)
    StringList(Vec<String>),
    /// Nested field map
    Nested(GameFields),
}

/// Game state update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMessage {
    /// Game room
    pub room_id: String,
    /// Display name of the sender
    pub sender_name: String,
    /// Game event name, interpreted by the rules engine
    pub event: String,
    /// Event fields
    pub fields: GameFields,
}

impl GameMessage {
    /// Encode to payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        put_str8(&mut buf, &self.room_id, MAX_PEER_ID_LEN);
        put_str8(&mut buf, &self.sender_name, MAX_DISPLAY_NAME_LEN);
        put_str8(&mut buf, &self.event, MAX_STR);
        encode_map(&mut buf, &self.fields, 1);
        buf
    }

    /// Decode from payload bytes.
    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut reader = Reader::new(data);
        let room_id = reader.str8("room_id", MAX_PEER_ID_LEN)?;
        let sender_name = reader.str8("sender_name", MAX_DISPLAY_NAME_LEN)?;
        let event = reader.str8("event", MAX_STR)?;
        let fields = decode_map(&mut reader, 1)?;
        reader.finish()?;
        Ok(Self {
            room_id,
            sender_name,
            event,
            fields,
        })
    }
}

fn encode_map(buf: &mut Vec<u8>, map: &GameFields, depth: usize) {
    // Nested maps that would exceed the depth limit are left out entirely
    let entries: Vec<_> = map
        .iter()
        .filter(|(_, value)| !matches!(value, GameValue::Nested(_)) || depth < MAX_GAME_NESTING)
        .take(MAX_ENTRIES)
        .collect();

    buf.push(entries.len() as u8);
    for (key, value) in entries {
        put_str8(buf, key, MAX_STR);
        encode_value(buf, value, depth);
    }
}

fn encode_value(buf: &mut Vec<u8>, value: &GameValue, depth: usize) {
    match value {
        GameValue::String(s) => {
            buf.push(TAG_STRING);
            put_str8(buf, s, MAX_STR);
        }
        GameValue::Int(n) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        GameValue::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*b));
        }
        GameValue::StringList(items) => {
            buf.push(TAG_STRING_LIST);
            let items = &items[..items.len().min(MAX_ENTRIES)];
            buf.push(items.len() as u8);
            for item in items {
                put_str8(buf, item, MAX_STR);
            }
        }
        GameValue::Nested(inner) => {
            buf.push(TAG_NESTED);
            encode_map(buf, inner, depth + 1);
        }
    }
}

fn decode_map(reader: &mut Reader<'_>, depth: usize) -> DecodeResult<GameFields> {
    if depth > MAX_GAME_NESTING {
        return Err(DecodeError::NestingTooDeep {
            max: MAX_GAME_NESTING,
        });
    }

    let count = reader.u8()?;
    let mut map = GameFields::new();
    for _ in 0..count {
        let key = reader.str8("field_key", MAX_STR)?;
        let value = decode_value(reader, depth)?;
        if map.contains_key(&key) {
            return Err(DecodeError::DuplicateKey(key));
        }
        map.insert(key, value);
    }
    Ok(map)
}

fn decode_value(reader: &mut Reader<'_>, depth: usize) -> DecodeResult<GameValue> {
    match reader.u8()? {
        TAG_STRING => Ok(GameValue::String(reader.str8("field_string", MAX_STR)?)),
        TAG_INT => Ok(GameValue::Int(reader.i64_le()?)),
        TAG_BOOL => match reader.u8()? {
            0 => Ok(GameValue::Bool(false)),
            1 => Ok(GameValue::Bool(true)),
            value => Err(DecodeError::InvalidValue {
                field: "field_bool",
                value,
            }),
        },
        TAG_STRING_LIST => {
            let count = reader.u8()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(reader.str8("field_list_item", MAX_STR)?);
            }
            Ok(GameValue::StringList(items))
        }
        TAG_NESTED => Ok(GameValue::Nested(decode_map(reader, depth + 1)?)),
        value => Err(DecodeError::InvalidValue {
            field: "field_tag",
            value,
        }),
    }
}
