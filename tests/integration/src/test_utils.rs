//! Test utilities for end-to-end mesh scenarios

use signalair_guard::{DefenseConfig, InboundPipeline, ManualClock};
use signalair_wire::{
    seal_payload, ChatPayload, CipherError, MeshMessage, MessageKind, SessionCipher,
    SignalPayload, SignalType,
};
use std::collections::HashMap;
use std::sync::Once;
use uuid::Uuid;

/// Fixed starting point for every scenario clock (minute-aligned).
pub const T0: u64 = 1_700_000_040;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per process. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Pipeline plus the clock driving it.
pub struct TestNode {
    pub pipeline: InboundPipeline,
    pub clock: ManualClock,
}

impl TestNode {
    /// Node with default configuration at [`T0`].
    pub fn new() -> Self {
        Self::with_config(DefenseConfig::default())
    }

    /// Node with explicit configuration at [`T0`].
    pub fn with_config(config: DefenseConfig) -> Self {
        init_tracing();
        let clock = ManualClock::new(T0);
        let pipeline = InboundPipeline::new(config, clock.shared());
        Self { pipeline, clock }
    }

    /// Current clock reading as a frame timestamp.
    pub fn now(&self) -> u32 {
        use signalair_guard::Clock;
        self.clock.now_secs() as u32
    }
}

/// Per-peer XOR cipher standing in for the real session cipher.
pub struct XorSessions {
    keys: HashMap<String, u8>,
}

impl XorSessions {
    /// Sessions with a random non-zero key for each peer.
    pub fn for_peers(peers: &[&str]) -> Self {
        let keys = peers
            .iter()
            .map(|peer| (peer.to_string(), rand::random::<u8>() | 1))
            .collect();
        Self { keys }
    }
}

impl SessionCipher for XorSessions {
    fn encrypt(&self, peer_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let key = self
            .keys
            .get(peer_id)
            .ok_or_else(|| CipherError::NoSession(peer_id.to_string()))?;
        Ok(plaintext.iter().map(|b| b ^ key).collect())
    }

    fn decrypt(&self, peer_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.encrypt(peer_id, ciphertext)
    }
}

/// Encoded chat frame with the text sealed for `peer`.
pub fn chat_frame(
    sessions: &XorSessions,
    peer: &str,
    id: &str,
    sender_name: &str,
    text: &str,
    timestamp: u32,
) -> anyhow::Result<Vec<u8>> {
    let chat = ChatPayload {
        message_id: Uuid::new_v4(),
        timestamp,
        sender_name: sender_name.to_string(),
        encrypted: true,
        text: seal_payload(sessions, peer, MessageKind::Chat, text.as_bytes().to_vec())?,
    };
    Ok(MeshMessage::with_id(id, MessageKind::Chat, chat.encode()).encode(timestamp))
}

/// Encoded signal frame. The body is left in the clear; the defense layer
/// never looks at it.
pub fn signal_frame(id: &str, signal_type: SignalType, timestamp: u32) -> Vec<u8> {
    let signal = SignalPayload {
        signal_id: Uuid::new_v4(),
        signal_type,
        timestamp,
        sequence: 1,
        device_name: "field-unit".to_string(),
        grid_code: Some("B7".to_string()),
        body: b"need assistance".to_vec(),
    };
    MeshMessage::with_id(id, MessageKind::Signal, signal.encode()).encode(timestamp)
}

/// Encoded system notice.
pub fn notice_frame(id: &str, text: &str, timestamp: u32) -> Vec<u8> {
    MeshMessage::with_id(id, MessageKind::System, text.as_bytes().to_vec()).encode(timestamp)
}
