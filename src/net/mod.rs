//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! listener.rs (bind + accept + backpressure permit)
//!     → coordinator (routing decision)
//!     → replay.rs (buffered prefix wrapped over the live stream)
//!     → session.rs (handler-facing connection surface)
//! ```
//!
//! # Design Decisions
//! - A connection handle has exactly one logical owner at any instant;
//!   transfer is a hand-off through a channel, never a share
//! - Replay never pushes bytes back into the OS receive buffer; the prefix
//!   lives in front of the read interface
//! - The backpressure permit travels with the connection so the slot is
//!   released only when the final owner finishes

pub mod listener;
pub mod replay;
pub mod session;

pub use listener::{ConnectionPermit, Listener};
