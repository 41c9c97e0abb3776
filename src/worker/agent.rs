//! Worker-side connection agent.
//!
//! # Responsibilities
//! - Attach the user handler (once per worker generation)
//! - Finalized deliveries: wrap the stream so the replayed prefix appears as
//!   freshly received bytes, then hand it to the handler
//! - Inspect-only connections: read one chunk, extract the configured
//!   header's value, report it back, without ever attaching the connection
//!   to the handler
//!
//! The agent never blocks on a single connection: inspection and handler
//! futures run as concurrent tasks; only their own progress suspends.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::BalancerConfig;
use crate::net::listener::ConnectionPermit;
use crate::net::replay::ReplayStream;
use crate::net::session::{HandlerFactory, SessionConn, SessionHandler};
use crate::observability::metrics;
use crate::worker::message::{AckReport, WorkerMessage};

/// First-chunk read size for proxy-mode inspection.
const INSPECT_CHUNK: usize = 4096;

/// Fatal worker outcomes, classified by the pool supervisor.
#[derive(Debug, thiserror::Error)]
pub(crate) enum AgentError {
    #[error("handler factory yielded no handler")]
    MissingHandler,
    #[error("connection handler panicked")]
    HandlerPanicked,
}

pub(crate) struct WorkerAgent {
    slot: usize,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
    ack_tx: mpsc::UnboundedSender<AckReport>,
    config: Arc<BalancerConfig>,
    factory: Arc<HandlerFactory>,
}

impl WorkerAgent {
    pub(crate) fn new(
        slot: usize,
        rx: mpsc::UnboundedReceiver<WorkerMessage>,
        ack_tx: mpsc::UnboundedSender<AckReport>,
        config: Arc<BalancerConfig>,
        factory: Arc<HandlerFactory>,
    ) -> Self {
        Self {
            slot,
            rx,
            ack_tx,
            config,
            factory,
        }
    }

    pub(crate) async fn run(mut self) -> Result<(), AgentError> {
        let handler: Arc<dyn SessionHandler> = match (self.factory)() {
            Some(handler) => Arc::from(handler),
            None => {
                tracing::error!(slot = self.slot, "worker has not created a handler");
                return Err(AgentError::MissingHandler);
            }
        };
        handler.on_ready(self.slot);
        tracing::debug!(slot = self.slot, "worker handler attached");

        let mut tasks: JoinSet<std::io::Result<()>> = JoinSet::new();
        loop {
            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(message) => self.accept_message(message, &handler, &mut tasks),
                    // Channel closed: this generation has been retired.
                    None => break,
                },
                Some(joined) = tasks.join_next() => {
                    Self::reap(self.slot, joined)?;
                }
            }
        }

        // Drain in-flight connections before retiring.
        while let Some(joined) = tasks.join_next().await {
            Self::reap(self.slot, joined)?;
        }
        Ok(())
    }

    /// A handler panic is fatal to the worker, the in-process analog of an
    /// uncaught exception crashing a worker process.
    fn reap(
        slot: usize,
        joined: Result<std::io::Result<()>, tokio::task::JoinError>,
    ) -> Result<(), AgentError> {
        match joined {
            Err(err) if err.is_panic() => Err(AgentError::HandlerPanicked),
            Err(_) => Ok(()),
            Ok(Err(err)) => {
                tracing::debug!(slot, error = %err, "connection task ended with I/O error");
                Ok(())
            }
            Ok(Ok(())) => Ok(()),
        }
    }

    fn accept_message(
        &self,
        message: WorkerMessage,
        handler: &Arc<dyn SessionHandler>,
        tasks: &mut JoinSet<std::io::Result<()>>,
    ) {
        match message {
            WorkerMessage::Deliver {
                conn,
                peer,
                buffered,
                permit,
            } => {
                let stream = if self.config.sync.enabled {
                    ReplayStream::gated(conn, buffered)
                } else {
                    ReplayStream::new(conn, buffered)
                };
                if stream.is_gated() {
                    tracing::trace!(
                        slot = self.slot,
                        peer = %peer,
                        event = %self.config.sync.event_name,
                        "replay deferred until handler signals readiness"
                    );
                }
                metrics::record_delivery();
                let session = SessionConn::new(stream, peer, self.slot, permit);
                tasks.spawn(handler.handle(session));
            }
            WorkerMessage::Inspect { conn, peer, permit } => {
                let header = self.config.proxy.header_name.to_lowercase();
                let ignore_missing = self.config.proxy.ignore_missing_header;
                let ack_tx = self.ack_tx.clone();
                let slot = self.slot;
                tasks.spawn(inspect(slot, conn, peer, permit, header, ignore_missing, ack_tx));
            }
        }
    }
}

/// Phase-1 inspection: read exactly one chunk and report the true identity.
///
/// The connection is dropped (destroyed) when the header is missing and the
/// policy says not to fall back; the backpressure permit goes with it.
async fn inspect(
    slot: usize,
    mut conn: TcpStream,
    peer: SocketAddr,
    permit: ConnectionPermit,
    header: String,
    ignore_missing: bool,
    ack_tx: mpsc::UnboundedSender<AckReport>,
) -> std::io::Result<()> {
    let mut chunk = vec![0u8; INSPECT_CHUNK];
    let read = conn.read(&mut chunk).await?;
    if read == 0 {
        tracing::trace!(slot, peer = %peer, "peer closed before sending data");
        return Ok(());
    }
    chunk.truncate(read);

    let identity = match extract_header_value(&chunk, &header) {
        Some(identity) => identity,
        None if ignore_missing => peer.ip().to_string(),
        None => {
            tracing::debug!(
                slot,
                peer = %peer,
                header = %header,
                "identity header missing, destroying connection"
            );
            return Ok(());
        }
    };

    tracing::trace!(slot, peer = %peer, identity = %identity, "inspection complete");
    // A closed ack channel means the balancer is gone; the connection dies
    // with this send.
    let _ = ack_tx.send(AckReport {
        conn,
        peer,
        identity,
        buffered: chunk,
        permit,
    });
    Ok(())
}

/// Case-insensitive header search within the first chunk.
///
/// The value runs from the colon to the next line terminator and is reported
/// lowercased and trimmed. An absent header yields `None`; a present-but-
/// empty value is a valid (empty) identity.
fn extract_header_value(chunk: &[u8], header: &str) -> Option<String> {
    let haystack = String::from_utf8_lossy(chunk).to_lowercase();
    let start = haystack.find(header)?;
    let colon = start + haystack[start..].find(':')?;
    let value_start = colon + 1;
    let value_end = haystack[value_start..]
        .find('\n')
        .map(|i| value_start + i)
        .unwrap_or(haystack.len());
    Some(haystack[value_start..value_end].trim().to_string())
}
