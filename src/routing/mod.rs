//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! direct mode:  peer address → identity::ip_octets → hash::HashRouter → slot
//! proxy mode:   inspected header value → identity::identity_octets
//!                   → hash::HashRouter → slot
//! ```
//!
//! # Design Decisions
//! - The hash is stateless and bit-exact: it is the session-affinity
//!   contract, shared read-only by every routing decision
//! - The seed is owned by the balancer, drawn once per lifetime, and passed
//!   in rather than read from ambient state
//! - Identity extraction is total: every peer address and every header value
//!   maps to a defined octet sequence

pub mod hash;
pub mod identity;

pub use hash::HashRouter;
