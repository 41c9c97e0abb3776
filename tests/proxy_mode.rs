//! Proxy-mode (header-aware) routing over the public surface.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{HandlerMode, TestApp};
use sticky_balancer::routing::hash::fold_identity;
use sticky_balancer::BalancerConfig;

fn proxy_config(workers: usize, ignore_missing: bool) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.worker_count = workers;
    config.proxy.enabled = true;
    config.proxy.ignore_missing_header = ignore_missing;
    config
}

#[tokio::test]
async fn header_identity_selects_the_hash_stable_worker() {
    let app = TestApp::new();
    let bound = common::spawn_balancer(proxy_config(4, false), &app, HandlerMode::Tag).await;

    let payload = "GET / HTTP/1.1\r\nX-Forwarded-For: 10.0.0.5\r\nHost: example\r\n\r\n";
    let expected = fold_identity(&[10, 0, 0, 5], bound.seed()) as usize % 4;

    // The inspecting worker varies (random pick); the final owner must not.
    // The reply also proves the inspected bytes were replayed byte-exact.
    for _ in 0..10 {
        let response = common::roundtrip(bound.local_addr(), payload.as_bytes())
            .await
            .unwrap();
        assert_eq!(response, format!("worker:{}:{}", expected, payload));
    }
}

#[tokio::test]
async fn missing_header_destroys_the_connection() {
    let app = TestApp::new();
    let bound = common::spawn_balancer(proxy_config(2, false), &app, HandlerMode::Tag).await;

    let response = common::roundtrip(
        bound.local_addr(),
        b"GET / HTTP/1.1\r\nHost: example\r\n\r\n",
    )
    .await
    .unwrap();
    assert_eq!(response, "");

    // No delivery ever reached a handler.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.handled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_header_falls_back_to_peer_address_when_allowed() {
    let app = TestApp::new();
    let bound = common::spawn_balancer(proxy_config(4, true), &app, HandlerMode::Tag).await;

    let payload = "GET / HTTP/1.1\r\nHost: example\r\n\r\n";
    // The ack carries the raw peer address, so the target matches what
    // direct mode would have chosen for this client.
    let expected = fold_identity(&[127, 0, 0, 1], bound.seed()) as usize % 4;

    let response = common::roundtrip(bound.local_addr(), payload.as_bytes())
        .await
        .unwrap();
    assert_eq!(response, format!("worker:{}:{}", expected, payload));
}

#[tokio::test]
async fn deferred_sync_parks_replay_until_released() {
    let mut config = proxy_config(2, false);
    config.sync.enabled = true;
    let app = TestApp::new();
    let bound = common::spawn_balancer(config, &app, HandlerMode::SyncProbe).await;

    let payload = "GET / HTTP/1.1\r\nX-Forwarded-For: 10.0.0.5\r\n\r\n";
    let response = common::roundtrip(bound.local_addr(), payload.as_bytes())
        .await
        .unwrap();
    // Parked while gated, then the full prefix arrives intact.
    assert_eq!(response, format!("gated:true:{}", payload));
}

#[tokio::test]
async fn header_match_is_case_insensitive() {
    let app = TestApp::new();
    let bound = common::spawn_balancer(proxy_config(4, false), &app, HandlerMode::Tag).await;

    let payload = "GET / HTTP/1.1\r\nX-FORWARDED-FOR: 10.0.0.5\r\n\r\n";
    let expected = fold_identity(&[10, 0, 0, 5], bound.seed()) as usize % 4;

    let response = common::roundtrip(bound.local_addr(), payload.as_bytes())
        .await
        .unwrap();
    assert!(response.starts_with(&format!("worker:{}:", expected)));
}
