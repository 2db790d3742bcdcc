//! Mesh Scenarios - Inbound traffic from cooperating and misbehaving peers
//!
//! # Test Scenarios
//!
//! 1. **Chat Retransmission**: the same chat frame delivered twice within 2 seconds
//! 2. **Stale Signal**: a signal stamped 10 minutes ago against a 5 minute window
//! 3. **Admission Burst**: 51 admission checks inside one second
//! 4. **Mixed Kinds**: every known kind accepted, then decrypted where confidential
//! 5. **Hostile Peer Isolation**: garbage from one peer never affects another

use signalair_guard::{
    DefenseConfig, Deduplicator, GuardError, RateWindow, Rejection, ReplayVerdict,
};
use signalair_wire::{
    open_payload, ChatPayload, GameFields, GameMessage, GameValue, HeartbeatPayload,
    KeyExchangePayload, MeshMessage, MessageKind, SignalType, TopologyPayload, ValidationError,
};

use crate::test_utils::{chat_frame, notice_frame, signal_frame, TestNode, XorSessions, T0};

#[test]
fn chat_retransmission_rejected_on_second_pass() -> anyhow::Result<()> {
    let node = TestNode::new();
    let sessions = XorSessions::for_peers(&["peerA"]);
    let bytes = chat_frame(&sessions, "peerA", "abc-123", "Alice", "hello", node.now())?;

    let first = node.pipeline.process("peerA", &bytes);
    assert!(first.is_ok(), "first delivery rejected: {first:?}");

    node.clock.advance(2);
    assert_eq!(
        node.pipeline.process("peerA", &bytes),
        Err(Rejection::Replay(ReplayVerdict::RejectedDuplicate))
    );
    Ok(())
}

#[test]
fn chat_dedup_reports_duplicate_on_second_pass() {
    let node = TestNode::new();
    let dedup = Deduplicator::new(DefenseConfig::default().dedup, node.clock.shared());

    assert!(!dedup.is_duplicate("abc-123", "peerA", node.now(), b"hello").unwrap());
    node.clock.advance(2);
    assert!(dedup.is_duplicate("abc-123", "peerA", T0 as u32, b"hello").unwrap());
}

#[test]
fn ten_minute_old_signal_rejected() {
    let node = TestNode::new();
    let bytes = signal_frame("sig-1", SignalType::Danger, (T0 - 600) as u32);

    assert_eq!(
        node.pipeline.process("peerB", &bytes),
        Err(Rejection::Replay(ReplayVerdict::RejectedExpired { age: 600 }))
    );
    assert_eq!(node.pipeline.statistics().unwrap().rejected_replay, 1);
}

#[test]
fn fifty_one_admissions_in_one_second() {
    let node = TestNode::new();
    let dedup = node.pipeline.deduplicator();

    let outcomes: Vec<_> = (0..51).map(|_| dedup.admit()).collect();
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 50);
    assert_eq!(
        outcomes[50],
        Err(GuardError::RateLimitExceeded {
            window: RateWindow::Second,
            limit: 50
        })
    );
}

#[test]
fn every_known_kind_accepted_and_confidential_bodies_decrypt() -> anyhow::Result<()> {
    let node = TestNode::new();
    let sessions = XorSessions::for_peers(&["peerA"]);
    let now = node.now();

    let chat = chat_frame(&sessions, "peerA", "c-1", "Alice", "meet at the well", now)?;
    let accepted = node.pipeline.process("peerA", &chat)?;
    let payload = ChatPayload::decode(&accepted.into_message().payload)?;
    assert!(payload.encrypted);
    let text = open_payload(&sessions, "peerA", MessageKind::Chat, payload.text)?;
    assert_eq!(text, b"meet at the well");

    let mut fields = GameFields::new();
    fields.insert("number".to_string(), GameValue::Int(17));
    let game = GameMessage {
        room_id: "bingo-1".to_string(),
        sender_name: "Alice".to_string(),
        event: "number_drawn".to_string(),
        fields,
    };
    let heartbeat = HeartbeatPayload {
        node_id: "peerA".to_string(),
        uptime_secs: 3600,
        peer_count: 4,
    };
    let topology = TopologyPayload {
        node_id: "peerA".to_string(),
        neighbors: vec!["peerB".to_string(), "peerC".to_string()],
    };
    let key_exchange = KeyExchangePayload {
        sender_id: "peerA".to_string(),
        retry_count: 0,
        public_key: vec![0x42; 32],
    };

    let frames = [
        (MessageKind::Game, game.encode()),
        (MessageKind::Heartbeat, heartbeat.encode()),
        (MessageKind::Topology, topology.encode()),
        (MessageKind::KeyExchange, key_exchange.encode()),
    ];
    for (kind, payload) in frames {
        let bytes = MeshMessage::new(kind, payload).encode(now);
        let result = node.pipeline.process("peerA", &bytes);
        assert!(result.is_ok(), "{kind} rejected: {result:?}");
    }

    let signal = signal_frame("s-1", SignalType::Supplies, now);
    assert!(node.pipeline.process("peerA", &signal).is_ok());
    assert!(node.pipeline.process("peerA", &notice_frame("n-1", "relay up", now)).is_ok());

    assert_eq!(node.pipeline.statistics()?.accepted, 7);
    Ok(())
}

#[test]
fn heartbeat_outside_its_drift_is_invalid() {
    let node = TestNode::new();
    let heartbeat = HeartbeatPayload {
        node_id: "peerA".to_string(),
        uptime_secs: 10,
        peer_count: 1,
    };
    let bytes = MeshMessage::new(MessageKind::Heartbeat, heartbeat.encode()).encode((T0 - 301) as u32);

    assert!(matches!(
        node.pipeline.process("peerA", &bytes),
        Err(Rejection::Invalid(ValidationError::TimestampOutOfRange { max_drift: 300, .. }))
    ));
}

#[test]
fn hostile_peer_does_not_affect_others() {
    let node = TestNode::new();
    let now = node.now();

    // Declared payload length far beyond the bytes present
    let mut oversized = notice_frame("x", "hi", now);
    oversized[4..8].copy_from_slice(&u32::MAX.to_le_bytes());

    let mut garbage: Vec<Vec<u8>> = vec![Vec::new(), vec![1, 0x02, 200], vec![9; 64], oversized];
    garbage.extend((0..50).map(|_| (0..32).map(|_| rand::random::<u8>()).collect::<Vec<u8>>()));

    for bytes in &garbage {
        assert!(node.pipeline.process("peerX", bytes).is_err());
    }

    let ok = node.pipeline.process("peerA", &notice_frame("n-1", "still here", now));
    assert!(ok.is_ok(), "honest peer rejected: {ok:?}");
}

#[test]
fn config_from_toml_shortens_replay_window() -> anyhow::Result<()> {
    let config = DefenseConfig::from_toml_str(
        r#"
        [replay]
        time_window_secs = 60
        "#,
    )?;
    let node = TestNode::with_config(config);

    let bytes = notice_frame("n-1", "late", (T0 - 61) as u32);
    assert_eq!(
        node.pipeline.process("peerA", &bytes),
        Err(Rejection::Replay(ReplayVerdict::RejectedExpired { age: 61 }))
    );
    Ok(())
}
