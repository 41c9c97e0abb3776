//! Handler-facing connection surface.
//!
//! # Responsibilities
//! - Define the contract between the balancer and the user's application
//!   handler (the business logic is opaque to the core)
//! - Present a delivered connection as one unbroken byte stream, replayed
//!   prefix included

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::net::listener::ConnectionPermit;
use crate::net::replay::ReplayStream;

/// Boxed connection-handling future returned by [`SessionHandler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = io::Result<()>> + Send>>;

/// The user-supplied application handler run inside each worker.
///
/// One handler instance is created per worker (and again on respawn) by the
/// [`HandlerFactory`]; connections the worker finally owns are attached
/// through [`SessionHandler::handle`].
pub trait SessionHandler: Send + Sync + 'static {
    /// Called once when a worker attaches this handler.
    ///
    /// No socket is ever bound on the worker side; the coordinator owns the
    /// listening endpoint, so this fires immediately, with the semantics of
    /// a listen-completion callback.
    fn on_ready(&self, _slot: usize) {}

    /// Entry point for a connection this worker owns.
    ///
    /// The first bytes read are any prefix consumed during routing, replayed
    /// as if freshly received.
    fn handle(&self, conn: SessionConn) -> HandlerFuture;
}

/// Factory invoked inside each worker to obtain its handler.
///
/// Yielding `None` is a fatal worker configuration error, reported at worker
/// startup.
pub type HandlerFactory = dyn Fn() -> Option<Box<dyn SessionHandler>> + Send + Sync;

/// A connection as seen by the owning worker's handler.
///
/// Reads yield the replayed prefix first, then live bytes; writes go
/// straight to the peer. Holds the connection's backpressure permit for as
/// long as the handler keeps the connection.
#[derive(Debug)]
pub struct SessionConn {
    stream: ReplayStream<TcpStream>,
    peer: SocketAddr,
    slot: usize,
    _permit: ConnectionPermit,
}

impl SessionConn {
    pub(crate) fn new(
        stream: ReplayStream<TcpStream>,
        peer: SocketAddr,
        slot: usize,
        permit: ConnectionPermit,
    ) -> Self {
        Self {
            stream,
            peer,
            slot,
            _permit: permit,
        }
    }

    /// Transport peer address. Under proxy mode this is the upstream proxy,
    /// not the client the connection was routed by.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Slot index of the worker that owns this connection.
    pub fn worker_slot(&self) -> usize {
        self.slot
    }

    /// Prefix bytes not yet replayed into reads.
    pub fn replay_pending(&self) -> usize {
        self.stream.pending_replay()
    }

    /// Whether the replayed prefix is parked behind the synchronization
    /// gate.
    pub fn replay_gated(&self) -> bool {
        self.stream.is_gated()
    }

    /// Release the replay gate (deferred synchronization mode).
    ///
    /// Until this is called on a gated connection, reads of the replayed
    /// prefix stay parked, letting the handler finish its setup first. A
    /// no-op when the connection is not gated.
    pub fn release_replay(&mut self) {
        self.stream.release();
    }
}

impl AsyncRead for SessionConn {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for SessionConn {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().stream).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_shutdown(cx)
    }
}
