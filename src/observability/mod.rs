//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`; the library never installs a global
//!   subscriber on its own; embedders (and tests) call
//!   [`logging::init_logging`]
//! - Metrics go through the `metrics` facade behind thin wrappers; no
//!   exporter is bundled, the embedding application installs its recorder

pub mod logging;
pub mod metrics;
