//! Message fingerprints.
//!
//! A fingerprint identifies a message by who sent it, what it claims to be
//! and what it actually contains. The content hash covers the raw payload
//! bytes only, so a retransmission of the same bytes under a reused id is
//! still caught and two different payloads under one id stay distinct.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Derived identity of a message used for replay and dedup decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageFingerprint {
    /// Message id from the frame envelope
    pub message_id: String,
    /// Transport-level sender identifier
    pub sender_id: String,
    /// Frame timestamp (unix seconds)
    pub timestamp: u32,
    /// Lower-case hex SHA-256 of the payload
    pub content_hash: String,
}

impl MessageFingerprint {
    /// Fingerprint a message.
    pub fn new(
        message_id: impl Into<String>,
        sender_id: impl Into<String>,
        timestamp: u32,
        content: &[u8],
    ) -> Self {
        Self {
            message_id: message_id.into(),
            sender_id: sender_id.into(),
            timestamp,
            content_hash: content_hash(content),
        }
    }

    /// Key shared by the replay guard and the deduplicator.
    pub fn unique_id(&self) -> String {
        format!("{}:{}:{}", self.sender_id, self.message_id, self.content_hash)
    }

    /// Seconds between the message timestamp and `now`; zero for future timestamps.
    pub fn age_at(&self, now: u64) -> u64 {
        now.saturating_sub(u64::from(self.timestamp))
    }
}

/// Lower-case hex SHA-256 of `content`.
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_content_with_sha256() {
        assert_eq!(
            content_hash(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn unique_id_layout() {
        let fp = MessageFingerprint::new("abc-123", "peerA", 1_700_000_000, b"hello");
        assert_eq!(
            fp.unique_id(),
            "peerA:abc-123:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn deterministic() {
        let a = MessageFingerprint::new("id", "peer", 1, b"payload");
        let b = MessageFingerprint::new("id", "peer", 1, b"payload");
        assert_eq!(a, b);
    }

    #[test]
    fn same_content_different_ids_distinct() {
        let a = MessageFingerprint::new("id-1", "peer", 1, b"payload");
        let b = MessageFingerprint::new("id-2", "peer", 1, b"payload");
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.unique_id(), b.unique_id());
    }

    #[test]
    fn same_id_different_content_distinct() {
        let a = MessageFingerprint::new("id", "peer", 1, b"one");
        let b = MessageFingerprint::new("id", "peer", 1, b"two");
        assert_ne!(a.unique_id(), b.unique_id());
    }

    #[test]
    fn timestamp_not_part_of_key() {
        let a = MessageFingerprint::new("id", "peer", 1, b"x");
        let b = MessageFingerprint::new("id", "peer", 2, b"x");
        assert_eq!(a.unique_id(), b.unique_id());
    }

    #[test]
    fn age_saturates_for_future_timestamps() {
        let fp = MessageFingerprint::new("id", "peer", 1000, b"");
        assert_eq!(fp.age_at(1060), 60);
        assert_eq!(fp.age_at(900), 0);
    }
}
