//! Balancer metrics.
//!
//! # Metrics
//! - `balancer_connections_total` (counter, by mode): accepted connections
//! - `balancer_handoffs_total` (counter): phase-3 deliveries after
//!   inspection
//! - `balancer_deliveries_total` (counter): connections attached to a
//!   handler
//! - `balancer_worker_exits_total` (counter, by cause): panic / error /
//!   clean / cancelled
//! - `balancer_worker_respawns_total` (counter)
//! - `balancer_routing_failures_total` (counter): phase-1 retry exhaustion
//! - `balancer_dead_worker_rejections_total` (counter)

use metrics::counter;

pub fn record_connection(mode: &'static str) {
    counter!("balancer_connections_total", "mode" => mode).increment(1);
}

pub fn record_handoff() {
    counter!("balancer_handoffs_total").increment(1);
}

pub fn record_delivery() {
    counter!("balancer_deliveries_total").increment(1);
}

pub fn record_worker_exit(cause: &'static str) {
    counter!("balancer_worker_exits_total", "cause" => cause).increment(1);
}

pub fn record_worker_respawn() {
    counter!("balancer_worker_respawns_total").increment(1);
}

pub fn record_routing_failure() {
    counter!("balancer_routing_failures_total").increment(1);
}

pub fn record_dead_worker_rejection() {
    counter!("balancer_dead_worker_rejections_total").increment(1);
}
