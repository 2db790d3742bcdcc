//! Flood handling under admission pressure and concurrent delivery.

use signalair_guard::{DefenseConfig, Rejection, ReplayVerdict};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::test_utils::{notice_frame, TestNode, T0};

#[test]
fn single_second_flood_rides_fail_safe_path_then_recovers() {
    let node = TestNode::new();
    let frames: Vec<_> = (0..200)
        .map(|i| notice_frame(&format!("f-{i}"), "flood", T0 as u32))
        .collect();

    let mut normal = 0;
    let mut rate_limited = 0;
    for bytes in &frames {
        match node.pipeline.process("peerZ", bytes) {
            Ok(accepted) if accepted.rate_limited => rate_limited += 1,
            Ok(_) => normal += 1,
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }

    // 50 admitted, every refusal after that takes the read-only dedup path
    assert_eq!(normal, 50);
    assert_eq!(rate_limited, 150);
    assert_eq!(node.pipeline.deduplicator().consecutive_errors(), 0);

    // Retransmissions inside the flood are still caught
    assert_eq!(
        node.pipeline.process("peerZ", &frames[120]),
        Err(Rejection::Replay(ReplayVerdict::RejectedDuplicate))
    );

    node.clock.advance(1);
    let recovered = node
        .pipeline
        .process("peerZ", &notice_frame("after", "calm", T0 as u32 + 1))
        .unwrap();
    assert!(!recovered.rate_limited);

    let stats = node.pipeline.statistics().unwrap();
    assert_eq!(stats.accepted, 201);
    assert_eq!(stats.rejected_overload, 0);
    assert_eq!(stats.rejected_replay, 1);
    assert_eq!(stats.dedup.rate_limiter.total_rejected, 151);
}

#[test]
fn concurrent_deliveries_accept_each_message_once() {
    let mut config = DefenseConfig::default();
    config.dedup.rate_limit.per_second = 10_000;
    config.dedup.rate_limit.per_minute = 10_000;
    let node = Arc::new(TestNode::with_config(config));

    let frames: Arc<Vec<_>> = Arc::new(
        (0..100)
            .map(|i| notice_frame(&format!("m-{i}"), "gossip", T0 as u32))
            .collect(),
    );

    // Four relays deliver the same 100 frames from the same origin
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let node = Arc::clone(&node);
            let frames = Arc::clone(&frames);
            thread::spawn(move || {
                frames
                    .iter()
                    .filter(|bytes| node.pipeline.process("origin", bytes).is_ok())
                    .count()
            })
        })
        .collect();
    let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(accepted, 100);
    let stats = node.pipeline.statistics().unwrap();
    assert_eq!(stats.rejected_replay, 300);
    assert_eq!(stats.replay.tracked, 100);
}

#[tokio::test(start_paused = true)]
async fn sweepers_prune_state_on_a_running_node() {
    let node = TestNode::new();
    for i in 0..20 {
        let bytes = notice_frame(&format!("s-{i}"), "hello", T0 as u32);
        assert!(node.pipeline.process("peerA", &bytes).is_ok());
    }
    let handles = node.pipeline.spawn_sweepers();

    // Past the replay window only
    node.clock.advance(400);
    tokio::time::sleep(Duration::from_secs(61)).await;
    let stats = node.pipeline.statistics().unwrap();
    assert_eq!(stats.replay.tracked, 0);
    assert_eq!(stats.dedup.cached, 20);

    // Past the dedup window too
    node.clock.advance(1500);
    tokio::time::sleep(Duration::from_secs(600)).await;
    let stats = node.pipeline.statistics().unwrap();
    assert_eq!(stats.dedup.cached, 0);
    assert_eq!(stats.dedup.swept, 20);

    for handle in handles {
        handle.shutdown().await;
    }
    let json = node.pipeline.statistics().unwrap().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["replay"]["swept"], 20);
    tracing::info!(stats = %json, "Final node statistics");
}
