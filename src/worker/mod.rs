//! Worker subsystem.
//!
//! # Data Flow
//! ```text
//! coordinator
//!     → handle.rs (liveness-guarded dispatch)
//!     → per-worker channel, FIFO   [ownership of the TcpStream moves
//!     → agent.rs                    with the message]
//!         Inspect: read one chunk → Ack back to coordinator
//!         Deliver: wrap in ReplayStream → user handler
//!
//! pool.rs supervises one agent per slot: classify exit, respawn into the
//! same slot; the pool size is invariant for the balancer's lifetime.
//! ```
//!
//! # Design Decisions
//! - Liveness is a shared flag on the handle, checked before every send;
//!   a dead target gets the failure written to the client, never a silent
//!   drop
//! - A handler panic kills its worker (the process-crash analog) and the
//!   supervisor respawns a fresh generation into the slot

pub mod agent;
pub mod handle;
pub mod message;
pub mod pool;

pub use handle::WorkerHandle;
pub use message::{AckReport, WorkerMessage, DEAD_WORKER_NOTICE};
pub use pool::WorkerPool;
