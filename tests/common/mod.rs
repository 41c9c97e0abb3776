//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sticky_balancer::net::session::HandlerFuture;
use sticky_balancer::{BalancerConfig, BoundBalancer, SessionConn, SessionHandler};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// How the test handler treats delivered connections.
#[derive(Clone, Copy)]
pub enum HandlerMode {
    /// Read one chunk, reply `worker:<slot>:<chunk>`, close.
    Tag,
    /// Like `Tag`, but first probes whether the replay gate parks the
    /// prefix; replies `gated:<bool>:<chunk>`.
    SyncProbe,
    /// Like `Tag`, but panics when the chunk starts with `boom`.
    PanicOnBoom,
}

/// Counters shared between the test body and every worker's handler.
#[derive(Clone, Default)]
pub struct TestApp {
    pub ready_workers: Arc<AtomicUsize>,
    pub handled: Arc<AtomicUsize>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(
        &self,
        mode: HandlerMode,
    ) -> impl Fn() -> Option<Box<dyn SessionHandler>> + Send + Sync + 'static {
        let app = self.clone();
        move || {
            Some(Box::new(TestHandler {
                app: app.clone(),
                mode,
            }) as Box<dyn SessionHandler>)
        }
    }
}

struct TestHandler {
    app: TestApp,
    mode: HandlerMode,
}

impl SessionHandler for TestHandler {
    fn on_ready(&self, _slot: usize) {
        self.app.ready_workers.fetch_add(1, Ordering::SeqCst);
    }

    fn handle(&self, mut conn: SessionConn) -> HandlerFuture {
        self.app.handled.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode;
        Box::pin(async move {
            let mut buf = vec![0u8; 4096];
            match mode {
                HandlerMode::Tag | HandlerMode::PanicOnBoom => {
                    let n = conn.read(&mut buf).await?;
                    if matches!(mode, HandlerMode::PanicOnBoom) && buf[..n].starts_with(b"boom") {
                        panic!("injected handler failure");
                    }
                    let reply = format!(
                        "worker:{}:{}",
                        conn.worker_slot(),
                        String::from_utf8_lossy(&buf[..n])
                    );
                    conn.write_all(reply.as_bytes()).await?;
                    conn.shutdown().await?;
                }
                HandlerMode::SyncProbe => {
                    let parked =
                        tokio::time::timeout(Duration::from_millis(50), conn.read(&mut buf))
                            .await
                            .is_err();
                    conn.release_replay();
                    let n = conn.read(&mut buf).await?;
                    let reply =
                        format!("gated:{}:{}", parked, String::from_utf8_lossy(&buf[..n]));
                    conn.write_all(reply.as_bytes()).await?;
                    conn.shutdown().await?;
                }
            }
            Ok(())
        })
    }
}

/// Start a balancer on an ephemeral loopback port and serve it in the
/// background.
pub async fn spawn_balancer(
    config: BalancerConfig,
    app: &TestApp,
    mode: HandlerMode,
) -> Arc<BoundBalancer> {
    sticky_balancer::observability::logging::init_logging(&config.observability);
    let balancer = sticky_balancer::start(config, app.factory(mode)).unwrap();
    let bound = Arc::new(
        balancer
            .bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap(),
    );
    let serving = Arc::clone(&bound);
    tokio::spawn(async move {
        let _ = serving.serve().await;
    });
    bound
}

/// Connect, send `payload`, read the full response until the server closes.
pub async fn roundtrip(addr: SocketAddr, payload: &[u8]) -> std::io::Result<String> {
    let mut conn = TcpStream::connect(addr).await?;
    conn.write_all(payload).await?;
    let mut response = String::new();
    conn.read_to_string(&mut response).await?;
    Ok(response)
}

/// Poll `cond` until it holds or `deadline` passes.
pub async fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
