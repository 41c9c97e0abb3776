//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! balancer. All types derive Serde traits for deserialization from config
//! files, and every field has a default so minimal configs work.

use serde::{Deserialize, Serialize};

/// Root configuration for the sticky balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Number of worker slots. The pool holds exactly this many workers for
    /// the balancer's lifetime; changing it reshuffles session affinity.
    pub worker_count: usize,

    /// Listener settings (backpressure).
    pub listener: ListenerConfig,

    /// Proxy-mode (header-aware) routing settings.
    pub proxy: ProxyConfig,

    /// Deferred replay synchronization settings.
    pub sync: SyncConfig,

    /// Worker respawn pacing.
    pub respawn: RespawnConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            listener: ListenerConfig::default(),
            proxy: ProxyConfig::default(),
            sync: SyncConfig::default(),
            respawn: RespawnConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Maximum concurrent connections admitted across the whole pool
    /// (backpressure). A connection holds its slot from accept until the
    /// owning handler finishes with it.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
        }
    }
}

/// Proxy-mode routing configuration.
///
/// When the balancer sits behind another proxy, the transport peer address
/// is the proxy, not the client; the true identity is carried in an
/// application-layer header and routing becomes a two-phase handoff.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Route by inspected header instead of peer address.
    pub enabled: bool,

    /// Header carrying the true client identity. Matched case-insensitively.
    pub header_name: String,

    /// If the header is absent from the first chunk, fall back to routing by
    /// the raw peer address instead of destroying the connection.
    pub ignore_missing_header: bool,

    /// Attempts at finding a live worker for phase-1 inspection before the
    /// connection is abandoned.
    pub max_pick_retries: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header_name: "x-forwarded-for".to_string(),
            ignore_missing_header: false,
            max_pick_retries: 15,
        }
    }
}

/// Deferred replay synchronization.
///
/// When enabled, a delivered connection's buffered prefix stays parked until
/// the handler signals readiness (`SessionConn::release_replay`), so the
/// handler can finish its per-connection setup before the first bytes
/// arrive.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Defer replay until the handler releases it.
    pub enabled: bool,

    /// Event name reported in diagnostics when replay is deferred.
    pub event_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            event_name: "sticky-sessions:syn".to_string(),
        }
    }
}

/// Respawn pacing for workers that fail during startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RespawnConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RespawnConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 50,
            max_delay_ms: 2_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
