//! Plaintext control payloads: heartbeats and topology advertisements.
//!
//! ```text
//! heartbeat: [node_id:str8][uptime_secs:4 BE][peer_count:2 BE]
//! topology:  [node_id:str8][neighbor_count:2 BE][neighbor_id:str8 * neighbor_count]
//! ```

use serde::{Deserialize, Serialize};

use super::MAX_PEER_ID_LEN;
use crate::buf::{check_len, put_str8, Reader};
use crate::error::DecodeResult;

/// Upper bound on neighbors in one advertisement; keeps the worst case under
/// the 8 KiB topology ceiling.
pub const MAX_TOPOLOGY_NEIGHBORS: usize = 120;

/// Liveness heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    /// Sending node
    pub node_id: String,
    /// Seconds since the node started its mesh session
    pub uptime_secs: u32,
    /// Number of directly connected peers
    pub peer_count: u16,
}

impl HeartbeatPayload {
    /// Encode to payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(7 + self.node_id.len());
        put_str8(&mut buf, &self.node_id, MAX_PEER_ID_LEN);
        buf.extend_from_slice(&self.uptime_secs.to_be_bytes());
        buf.extend_from_slice(&self.peer_count.to_be_bytes());
        buf
    }

    /// Decode from payload bytes.
    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut reader = Reader::new(data);
        let node_id = reader.str8("node_id", MAX_PEER_ID_LEN)?;
        let uptime_secs = reader.u32_be()?;
        let peer_count = reader.u16_be()?;
        reader.finish()?;
        Ok(Self {
            node_id,
            uptime_secs,
            peer_count,
        })
    }
}

/// Topology advertisement listing a node's direct neighbors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyPayload {
    /// Advertising node
    pub node_id: String,
    /// Direct neighbors of `node_id`
    pub neighbors: Vec<String>,
}

impl TopologyPayload {
    /// Encode to payload bytes. Neighbors beyond [`MAX_TOPOLOGY_NEIGHBORS`] are dropped.
    pub fn encode(&self) -> Vec<u8> {
        let neighbors = &self.neighbors[..self.neighbors.len().min(MAX_TOPOLOGY_NEIGHBORS)];
        let mut buf = Vec::with_capacity(3 + self.node_id.len() + neighbors.len() * 16);
        put_str8(&mut buf, &self.node_id, MAX_PEER_ID_LEN);
        buf.extend_from_slice(&(neighbors.len() as u16).to_be_bytes());
        for neighbor in neighbors {
            put_str8(&mut buf, neighbor, MAX_PEER_ID_LEN);
        }
        buf
    }

    /// Decode from payload bytes.
    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut reader = Reader::new(data);
        let node_id = reader.str8("node_id", MAX_PEER_ID_LEN)?;
        let count = reader.u16_be()? as usize;
        check_len("neighbor_count", count, MAX_TOPOLOGY_NEIGHBORS)?;

        let mut neighbors = Vec::with_capacity(count);
        for _ in 0..count {
            neighbors.push(reader.str8("neighbor_id", MAX_PEER_ID_LEN)?);
        }
        reader.finish()?;
        Ok(Self { node_id, neighbors })
    }
}
