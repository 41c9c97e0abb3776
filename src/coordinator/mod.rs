//! Coordinator: accept loop and routing decisions.
//!
//! # Data Flow
//! ```text
//! direct mode:
//!     accept → hash(peer address) → Deliver to slot (no bytes consumed)
//!
//! proxy mode (two-phase):
//!     accept → uniform-random live pick → Inspect
//!         → worker acks {identity, consumed bytes, connection}
//!         → hash(identity) → Deliver(bytes) to the hash-stable slot
//! ```
//!
//! # Design Decisions
//! - The two-phase indirection exists because transport-layer identity and
//!   application-layer identity diverge behind an upstream proxy; the hash
//!   can only run once the header has been read
//! - The phase-1 pick is random, not hashed: the inspecting worker is a
//!   temporary custodian, not the session owner
//! - Per-connection message order is FIFO; connections are independent

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::config::BalancerConfig;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::listener::{ConnectionPermit, Listener};
use crate::observability::metrics;
use crate::routing::hash::HashRouter;
use crate::routing::identity::{identity_octets, ip_octets};
use crate::worker::handle::WorkerHandle;
use crate::worker::message::{AckReport, WorkerMessage};
use crate::worker::pool::WorkerPool;

pub struct Coordinator {
    config: Arc<BalancerConfig>,
    router: HashRouter,
    pool: Arc<WorkerPool>,
}

impl Coordinator {
    pub(crate) fn new(
        config: Arc<BalancerConfig>,
        router: HashRouter,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            config,
            router,
            pool,
        }
    }

    /// Run the accept loop until shutdown triggers or accept fails.
    pub(crate) async fn run(
        &self,
        listener: &Listener,
        mut shutdown: ShutdownSignal,
    ) -> std::io::Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (conn, peer, permit) = accepted?;
                    self.dispatch(conn, peer, permit).await;
                }
                _ = shutdown.triggered() => {
                    tracing::info!("coordinator stopping: shutdown triggered");
                    return Ok(());
                }
            }
        }
    }

    async fn dispatch(&self, conn: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        if self.config.proxy.enabled {
            self.dispatch_proxy(conn, peer, permit).await;
        } else {
            self.dispatch_direct(conn, peer, permit).await;
        }
    }

    /// Direct mode: the transport peer address is the client identity; the
    /// connection moves to its worker with no bytes consumed.
    async fn dispatch_direct(&self, conn: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        let index = self.router.index(&ip_octets(peer.ip()));
        metrics::record_connection("direct");
        tracing::trace!(peer = %peer, slot = index, "routing by peer address");
        self.pool
            .route(index)
            .dispatch(WorkerMessage::Deliver {
                conn,
                peer,
                buffered: Vec::new(),
                permit,
            })
            .await;
    }

    /// Proxy mode phase 1: the true identity hides in an application-layer
    /// header, so a pseudo-randomly picked live worker inspects the first
    /// chunk before the real routing decision.
    async fn dispatch_proxy(&self, conn: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        metrics::record_connection("proxy");
        match pick_live_worker(&self.pool, self.config.proxy.max_pick_retries) {
            Some(handle) => {
                tracing::trace!(
                    peer = %peer,
                    slot = handle.slot(),
                    "sending connection for header inspection"
                );
                handle
                    .dispatch(WorkerMessage::Inspect { conn, peer, permit })
                    .await;
            }
            None => {
                // Exactly one diagnostic; the connection is dropped
                // unanswered rather than silently leaked.
                tracing::error!(
                    peer = %peer,
                    attempts = self.config.proxy.max_pick_retries,
                    "no live worker found, abandoning connection"
                );
                metrics::record_routing_failure();
            }
        }
    }
}

/// Uniform-random worker pick, re-drawn each attempt against the liveness
/// check.
fn pick_live_worker(pool: &WorkerPool, max_retries: u32) -> Option<WorkerHandle> {
    for _ in 0..max_retries {
        let handle = pool.route(fastrand::usize(..pool.len()));
        if handle.is_alive() {
            return Some(handle);
        }
    }
    None
}

/// Phase 3: resolve worker acknowledgements to their hash-stable owner and
/// finish the delivery, consumed bytes riding along for replay.
pub(crate) async fn run_ack_loop(
    mut ack_rx: mpsc::UnboundedReceiver<AckReport>,
    router: HashRouter,
    pool: Arc<WorkerPool>,
) {
    while let Some(report) = ack_rx.recv().await {
        let index = router.index(&identity_octets(&report.identity));
        tracing::trace!(
            peer = %report.peer,
            identity = %report.identity,
            slot = index,
            "routing by reported identity"
        );
        metrics::record_handoff();
        let AckReport {
            conn,
            peer,
            buffered,
            permit,
            ..
        } = report;
        pool.route(index)
            .dispatch(WorkerMessage::Deliver {
                conn,
                peer,
                buffered,
                permit,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::listener::ConnectionPermit as Permit;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn dead_pool(size: usize) -> Arc<WorkerPool> {
        let handles: Vec<WorkerHandle> = (0..size)
            .map(|slot| {
                let (handle, _rx) = WorkerHandle::new(slot, 0);
                handle.mark_dead();
                handle
            })
            .collect();
        WorkerPool::from_handles(handles)
    }

    #[test]
    fn pick_returns_none_when_all_workers_dead() {
        let pool = dead_pool(4);
        assert!(pick_live_worker(&pool, 15).is_none());
    }

    #[test]
    fn pick_finds_the_live_worker() {
        let handles: Vec<WorkerHandle> = (0..4)
            .map(|slot| {
                let (handle, _rx) = WorkerHandle::new(slot, 0);
                if slot != 2 {
                    handle.mark_dead();
                }
                handle
            })
            .collect();
        let pool = WorkerPool::from_handles(handles);
        // Enough re-draws that missing the single live slot is implausible.
        let picked = pick_live_worker(&pool, 500).expect("live worker exists");
        assert_eq!(picked.slot(), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_abandon_the_connection() {
        let mut config = BalancerConfig::default();
        config.worker_count = 3;
        config.proxy.enabled = true;
        let config = Arc::new(config);

        let coordinator =
            Coordinator::new(Arc::clone(&config), HashRouter::new(0, 3), dead_pool(3));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();

        coordinator
            .dispatch(server, peer, Permit::for_tests())
            .await;

        // Abandoned: closed without any bytes, no diagnostic on the wire.
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }
}
