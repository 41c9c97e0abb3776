//! Startup wiring: seed, worker pool, public server surface.
//!
//! # Responsibilities
//! - Validate configuration before anything spawns
//! - Draw the routing seed once per balancer lifetime
//! - Spawn the worker pool and the phase-3 ack loop
//! - Expose the bindable server surface; only the coordinator binds a socket

use std::net::SocketAddr;
use std::sync::Arc;

use rand::RngCore;
use tokio::sync::mpsc;

use crate::config::{validate_config, BalancerConfig, ValidationError};
use crate::coordinator::{run_ack_loop, Coordinator};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::listener::Listener;
use crate::net::session::{HandlerFactory, SessionHandler};
use crate::routing::hash::{HashRouter, SEED_MASK};
use crate::worker::pool::WorkerPool;

/// Errors surfaced by the public startup/serve surface.
#[derive(Debug, thiserror::Error)]
pub enum BalancerError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Start the balancer: validate, seed, spawn workers, wire the ack loop.
///
/// `factory` runs once inside every worker (and again on respawn) to obtain
/// the application handler. Must be called within a Tokio runtime. The
/// returned [`Balancer`] has not bound a socket yet; `bind`/`listen` does
/// that.
pub fn start<F>(config: BalancerConfig, factory: F) -> Result<Balancer, BalancerError>
where
    F: Fn() -> Option<Box<dyn SessionHandler>> + Send + Sync + 'static,
{
    validate_config(&config).map_err(BalancerError::Config)?;
    let config = Arc::new(config);

    let seed = generate_seed();
    let router = HashRouter::new(seed, config.worker_count);

    let factory: Arc<HandlerFactory> = Arc::new(factory);
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    let pool = WorkerPool::spawn(Arc::clone(&config), factory, ack_tx);
    tokio::spawn(run_ack_loop(ack_rx, router, Arc::clone(&pool)));

    tracing::info!(
        workers = config.worker_count,
        seed,
        proxy = config.proxy.enabled,
        "balancer started"
    );

    Ok(Balancer {
        config,
        router,
        pool,
        shutdown: Shutdown::new(),
    })
}

/// Routing seed: 31 bits of OS entropy, fixed for the balancer's lifetime
/// so affinity survives worker respawns but stays unpredictable across
/// runs.
fn generate_seed() -> u32 {
    rand::rngs::OsRng.next_u32() & SEED_MASK
}

/// A started balancer that has not bound its public endpoint yet.
pub struct Balancer {
    config: Arc<BalancerConfig>,
    router: HashRouter,
    pool: Arc<WorkerPool>,
    shutdown: Shutdown,
}

impl std::fmt::Debug for Balancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Balancer")
            .field("seed", &self.router.seed())
            .field("worker_count", &self.pool.len())
            .finish_non_exhaustive()
    }
}

impl Balancer {
    /// The routing seed in use (diagnostics; stable for this instance).
    pub fn seed(&self) -> u32 {
        self.router.seed()
    }

    /// Number of worker slots.
    pub fn worker_count(&self) -> usize {
        self.pool.len()
    }

    /// Workers currently alive (always ≤ `worker_count`; respawn closes the
    /// gap).
    pub fn live_workers(&self) -> usize {
        self.pool.live_count()
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Bind the public endpoint.
    pub async fn bind(self, addr: SocketAddr) -> Result<BoundBalancer, BalancerError> {
        let listener = Listener::bind(addr, &self.config.listener)
            .await
            .map_err(BalancerError::Bind)?;
        let local_addr = listener.local_addr().map_err(BalancerError::Bind)?;
        Ok(BoundBalancer {
            balancer: self,
            listener,
            local_addr,
        })
    }

    /// Convenience: bind all interfaces on `port` and serve until shutdown.
    pub async fn listen(self, port: u16) -> Result<(), BalancerError> {
        self.bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .await?
            .serve()
            .await
    }
}

/// A balancer with its public endpoint bound, ready to serve.
pub struct BoundBalancer {
    balancer: Balancer,
    listener: Listener,
    local_addr: SocketAddr,
}

impl BoundBalancer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn seed(&self) -> u32 {
        self.balancer.seed()
    }

    pub fn worker_count(&self) -> usize {
        self.balancer.worker_count()
    }

    pub fn live_workers(&self) -> usize {
        self.balancer.live_workers()
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.balancer.shutdown_handle()
    }

    /// Run the accept loop until shutdown triggers or accept fails.
    pub async fn serve(&self) -> Result<(), BalancerError> {
        let signal = self.balancer.shutdown.subscribe();
        let coordinator = Coordinator::new(
            Arc::clone(&self.balancer.config),
            self.balancer.router,
            Arc::clone(&self.balancer.pool),
        );
        coordinator
            .run(&self.listener, signal)
            .await
            .map_err(BalancerError::Accept)
    }
}
