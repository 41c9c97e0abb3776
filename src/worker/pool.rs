//! Worker pool: spawn, supervise, respawn.
//!
//! # Responsibilities
//! - Hold exactly N worker slots for the balancer's lifetime
//! - Supervise one agent per slot: classify its exit, mark the outgoing
//!   generation dead, spawn a replacement into the same slot
//! - Pace respawns after startup failures so a broken handler factory
//!   cannot spin the supervisor hot
//!
//! # Design Decisions
//! - Slots are stable; session affinity keys on the slot index, so a
//!   respawned worker inherits its predecessor's traffic
//! - Exit taxonomy mirrors process supervision: panic ↔ killed, agent error
//!   ↔ non-zero exit, channel-closed return ↔ clean exit

use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::BalancerConfig;
use crate::net::session::HandlerFactory;
use crate::observability::metrics;
use crate::worker::agent::{AgentError, WorkerAgent};
use crate::worker::handle::WorkerHandle;
use crate::worker::message::{AckReport, WorkerMessage};

/// Fixed-size collection of supervised worker slots.
pub struct WorkerPool {
    slots: Vec<RwLock<WorkerHandle>>,
}

impl WorkerPool {
    /// Spawn `config.worker_count` supervised workers, one per slot.
    pub fn spawn(
        config: Arc<BalancerConfig>,
        factory: Arc<HandlerFactory>,
        ack_tx: mpsc::UnboundedSender<AckReport>,
    ) -> Arc<Self> {
        let mut slots = Vec::with_capacity(config.worker_count);
        let mut receivers = Vec::with_capacity(config.worker_count);
        for slot in 0..config.worker_count {
            let (handle, rx) = WorkerHandle::new(slot, 0);
            slots.push(RwLock::new(handle));
            receivers.push(rx);
        }

        let pool = Arc::new(Self { slots });
        for (slot, rx) in receivers.into_iter().enumerate() {
            tokio::spawn(supervise(
                Arc::clone(&pool),
                slot,
                rx,
                Arc::clone(&config),
                Arc::clone(&factory),
                ack_tx.clone(),
            ));
        }
        pool
    }

    /// Number of slots; invariant over the pool's lifetime.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots whose current generation is alive.
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| read_slot(slot).is_alive())
            .count()
    }

    /// Current handle for a slot (taken modulo the pool size).
    pub fn route(&self, index: usize) -> WorkerHandle {
        read_slot(&self.slots[index % self.slots.len()]).clone()
    }

    pub(crate) fn replace(&self, slot: usize, handle: WorkerHandle) {
        let mut guard = self.slots[slot]
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = handle;
    }

    #[cfg(test)]
    pub(crate) fn from_handles(handles: Vec<WorkerHandle>) -> Arc<Self> {
        Arc::new(Self {
            slots: handles.into_iter().map(RwLock::new).collect(),
        })
    }
}

fn read_slot(slot: &RwLock<WorkerHandle>) -> std::sync::RwLockReadGuard<'_, WorkerHandle> {
    // A poisoned lock only means a writer panicked mid-swap; the handle
    // itself is always a consistent value.
    slot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Supervision loop for one slot: run the agent, classify its death,
/// respawn a fresh generation into the slot.
async fn supervise(
    pool: Arc<WorkerPool>,
    slot: usize,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
    config: Arc<BalancerConfig>,
    factory: Arc<HandlerFactory>,
    ack_tx: mpsc::UnboundedSender<AckReport>,
) {
    let mut rx = rx;
    let mut generation: u64 = 0;
    let mut startup_failures: u32 = 0;

    loop {
        let alive = pool.route(slot).alive_flag();
        let agent = WorkerAgent::new(
            slot,
            rx,
            ack_tx.clone(),
            Arc::clone(&config),
            Arc::clone(&factory),
        );
        let outcome = tokio::spawn(agent.run()).await;
        alive.store(false, Ordering::SeqCst);

        let cause = match &outcome {
            Err(join_err) if join_err.is_panic() => {
                tracing::warn!(slot, generation, "worker was killed by a panic");
                "panic"
            }
            Err(_) => {
                tracing::warn!(slot, generation, "worker task was cancelled");
                "cancelled"
            }
            Ok(Err(AgentError::HandlerPanicked)) => {
                tracing::warn!(slot, generation, "worker was killed: handler panicked");
                "panic"
            }
            Ok(Err(err)) => {
                tracing::warn!(slot, generation, error = %err, "worker exited with an error");
                "error"
            }
            Ok(Ok(())) => {
                tracing::info!(slot, generation, "worker died");
                "clean"
            }
        };
        metrics::record_worker_exit(cause);

        if matches!(&outcome, Ok(Err(AgentError::MissingHandler))) {
            startup_failures += 1;
            let delay = respawn_backoff(
                startup_failures,
                config.respawn.base_delay_ms,
                config.respawn.max_delay_ms,
            );
            tracing::warn!(slot, attempt = startup_failures, delay_ms = delay.as_millis() as u64,
                "worker failed during startup, pacing respawn");
            tokio::time::sleep(delay).await;
        } else {
            startup_failures = 0;
        }

        generation += 1;
        let (handle, new_rx) = WorkerHandle::new(slot, generation);
        rx = new_rx;
        pool.replace(slot, handle);
        metrics::record_worker_respawn();
        tracing::info!(slot, generation, "respawned worker into slot");
    }
}

/// Exponential backoff with jitter for respawn pacing.
fn respawn_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let exponential = 2u64.saturating_pow(attempt.saturating_sub(1));
    let capped = base_ms.saturating_mul(exponential).min(max_ms);
    let jitter = if capped >= 10 { fastrand::u64(0..capped / 10) } else { 0 };
    Duration::from_millis(capped + jitter)
}
