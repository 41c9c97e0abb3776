//! Coordinator-side worker proxy.
//!
//! # Responsibilities
//! - Track one worker's liveness
//! - Forward connection-transfer messages, FIFO
//! - Guard every send against a dead target: the client gets an explicit
//!   error on the wire instead of a silent drop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::observability::metrics;
use crate::worker::message::{WorkerMessage, DEAD_WORKER_NOTICE};

/// Cheap clonable proxy for one worker slot's current process generation.
///
/// Clones share the liveness flag and the message channel; a handle taken
/// before a respawn observes the old generation as dead.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    slot: usize,
    generation: u64,
    alive: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<WorkerMessage>,
}

impl WorkerHandle {
    /// Create a handle and the receiving end its agent will consume.
    pub(crate) fn new(
        slot: usize,
        generation: u64,
    ) -> (Self, mpsc::UnboundedReceiver<WorkerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                slot,
                generation,
                alive: Arc::new(AtomicBool::new(true)),
                tx,
            },
            rx,
        )
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn alive_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.alive)
    }

    pub(crate) fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Dead-worker-aware send.
    ///
    /// Liveness is checked before dispatch; a target found dead (flag down,
    /// or channel closed when losing the race with worker death) gets the
    /// failure written onto the client connection, which is then closed.
    pub async fn dispatch(&self, message: WorkerMessage) {
        if !self.is_alive() {
            self.reject(message).await;
            return;
        }
        if let Err(mpsc::error::SendError(message)) = self.tx.send(message) {
            self.reject(message).await;
        }
    }

    async fn reject(&self, message: WorkerMessage) {
        let (mut conn, peer, _permit) = message.into_parts();
        tracing::warn!(
            slot = self.slot,
            generation = self.generation,
            peer = %peer,
            "refusing connection: target worker is dead"
        );
        metrics::record_dead_worker_rejection();
        let _ = conn.write_all(DEAD_WORKER_NOTICE.as_bytes()).await;
        let _ = conn.shutdown().await;
    }
}
