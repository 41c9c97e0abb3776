//! Sticky-session load balancer for a pool of workers sharing one port.
//!
//! A single coordinator accepts every inbound TCP connection and routes it to
//! a worker chosen deterministically by client identity, so all connections
//! from one client land on the same worker without a shared session store.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌────────────────────────────────────────────────────────┐
//!                │                     COORDINATOR                        │
//!                │                                                        │
//!  Client ───────┼─▶ net::listener ───▶ coordinator ───▶ routing::hash    │
//!                │       (accept)        (dispatch)       (identity→slot) │
//!                │                           │                            │
//!                │        direct mode        │        proxy mode          │
//!                │   Deliver, no bytes       │   Inspect → worker reads   │
//!                │   consumed                │   one chunk → Ack with     │
//!                │                           │   identity + bytes →       │
//!                │                           ▼   re-hash → Deliver(bytes) │
//!                │                     worker::pool                       │
//!                │            (N supervised slots, respawn on death)      │
//!                └───────────────────────────┬────────────────────────────┘
//!                                            │ ownership moves over a
//!                                            ▼ per-worker channel (FIFO)
//!                                      worker::agent
//!                               net::replay (buffered prefix)
//!                                            │
//!                                            ▼
//!                                  user SessionHandler
//! ```
//!
//! The routing hash is part of the compatibility contract: the same
//! (identity, seed, worker count) always selects the same slot, and the seed
//! is fixed for the balancer's lifetime, so affinity survives individual
//! worker respawns as long as the worker count is unchanged.

// Core subsystems
pub mod config;
pub mod coordinator;
pub mod net;
pub mod routing;
pub mod worker;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::BalancerConfig;
pub use lifecycle::shutdown::Shutdown;
pub use lifecycle::startup::{start, Balancer, BalancerError, BoundBalancer};
pub use net::replay::ReplayStream;
pub use net::session::{SessionConn, SessionHandler};
