//! Worker failure and recovery.

mod common;

use std::time::Duration;

use common::{HandlerMode, TestApp};
use sticky_balancer::routing::hash::fold_identity;
use sticky_balancer::BalancerConfig;

#[tokio::test]
async fn worker_respawn_preserves_pool_size_and_affinity() {
    let mut config = BalancerConfig::default();
    config.worker_count = 2;
    let app = TestApp::new();
    let bound = common::spawn_balancer(config, &app, HandlerMode::PanicOnBoom).await;
    let addr = bound.local_addr();

    let expected = fold_identity(&[127, 0, 0, 1], bound.seed()) as usize % 2;
    let first = common::roundtrip(addr, b"hello").await.unwrap();
    assert_eq!(first, format!("worker:{}:hello", expected));

    // Kill the worker owning this client: the handler panics mid-connection
    // and the client sees the connection drop without a reply.
    let killed = common::roundtrip(addr, b"boom").await.unwrap_or_default();
    assert!(killed.is_empty());

    // The supervisor respawns into the same slot; the pool size is
    // invariant and, with the seed unchanged, so is the affinity mapping.
    assert!(
        common::wait_until(Duration::from_secs(2), || bound.live_workers() == 2).await
    );
    assert_eq!(bound.worker_count(), 2);

    let wanted = format!("worker:{}:hello again", expected);
    let mut recovered = false;
    for _ in 0..50 {
        if let Ok(response) = common::roundtrip(addr, b"hello again").await {
            if response == wanted {
                recovered = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(recovered, "respawned worker must serve the same identity");
}

#[tokio::test]
async fn unaffected_workers_keep_serving_during_respawn() {
    let mut config = BalancerConfig::default();
    config.worker_count = 2;
    let app = TestApp::new();
    let bound = common::spawn_balancer(config, &app, HandlerMode::PanicOnBoom).await;
    let addr = bound.local_addr();

    let _ = common::roundtrip(addr, b"boom").await;

    // The slot that does not own this client was never touched; the pool
    // keeps its size through the respawn either way.
    assert!(
        common::wait_until(Duration::from_secs(2), || bound.live_workers() == 2).await
    );
    assert_eq!(bound.worker_count(), 2);
}
