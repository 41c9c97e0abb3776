//! Coordinator ⇄ worker message contract.
//!
//! Messages carry live `TcpStream`s, so they never cross a serialization
//! boundary; sending one moves exclusive ownership of the connection to the
//! receiver. Delivery order per worker is FIFO.

use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::net::listener::ConnectionPermit;

/// Diagnostic written to a client whose target worker died before the
/// handoff message could be dispatched.
pub const DEAD_WORKER_NOTICE: &str = "Error: worker has died";

/// Coordinator → worker handoff messages.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Phase-1 inspection request: read one chunk and report the true client
    /// identity back. The connection is not yet owned by this worker's
    /// handler and must not be attached to it.
    Inspect {
        conn: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
    },

    /// Final delivery: the worker owns the connection from here on.
    /// `buffered` holds any bytes consumed during inspection, to be replayed
    /// ahead of live reads (empty in direct mode).
    Deliver {
        conn: TcpStream,
        peer: SocketAddr,
        buffered: Vec<u8>,
        permit: ConnectionPermit,
    },
}

impl WorkerMessage {
    /// Tear a message apart when the target worker turned out to be dead.
    pub(crate) fn into_parts(self) -> (TcpStream, SocketAddr, ConnectionPermit) {
        match self {
            WorkerMessage::Inspect { conn, peer, permit } => (conn, peer, permit),
            WorkerMessage::Deliver {
                conn, peer, permit, ..
            } => (conn, peer, permit),
        }
    }
}

/// Worker → coordinator phase-2 acknowledgement.
///
/// Returns the connection, the inspected bytes, and the true identity so the
/// coordinator can hash and perform the final delivery.
#[derive(Debug)]
pub struct AckReport {
    pub conn: TcpStream,
    pub peer: SocketAddr,
    /// True client identity extracted from the inspected chunk, or the raw
    /// peer address under the ignore-missing-header policy.
    pub identity: String,
    /// Bytes consumed during inspection, owed to the final owner.
    pub buffered: Vec<u8>,
    pub permit: ConnectionPermit,
}
