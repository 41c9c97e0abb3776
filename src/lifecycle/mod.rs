//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → draw routing seed → spawn worker pool + ack loop
//!         → Balancer (bindable server surface) → bind → serve
//!
//! Shutdown (shutdown.rs):
//!     trigger() → accept loop stops → serve() returns
//! ```
//!
//! # Design Decisions
//! - The seed and the pool are constructed once at startup and owned by the
//!   balancer; nothing reads them from ambient globals
//! - Shutdown stops accepting; in-flight connections drain in their workers

pub mod shutdown;
pub mod startup;
