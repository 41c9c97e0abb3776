//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (worker count, retry budget, connection limit)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use crate::config::schema::BalancerConfig;

/// A single semantic violation in a [`BalancerConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `worker_count` is zero; the pool must hold at least one worker.
    NoWorkers,
    /// Proxy mode is enabled but the header name is empty.
    EmptyHeaderName,
    /// `proxy.max_pick_retries` is zero; phase 1 could never pick a worker.
    NoPickRetries,
    /// `listener.max_connections` is zero; no connection could be admitted.
    NoConnectionSlots,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NoWorkers => write!(f, "worker_count must be at least 1"),
            ValidationError::EmptyHeaderName => {
                write!(f, "proxy.header_name must not be empty when proxy mode is enabled")
            }
            ValidationError::NoPickRetries => {
                write!(f, "proxy.max_pick_retries must be at least 1")
            }
            ValidationError::NoConnectionSlots => {
                write!(f, "listener.max_connections must be at least 1")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a configuration for semantic violations, collecting every error.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.worker_count == 0 {
        errors.push(ValidationError::NoWorkers);
    }
    if config.proxy.enabled && config.proxy.header_name.trim().is_empty() {
        errors.push(ValidationError::EmptyHeaderName);
    }
    if config.proxy.max_pick_retries == 0 {
        errors.push(ValidationError::NoPickRetries);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::NoConnectionSlots);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&BalancerConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = BalancerConfig::default();
        config.worker_count = 0;
        config.proxy.enabled = true;
        config.proxy.header_name = "  ".to_string();
        config.proxy.max_pick_retries = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::NoWorkers,
                ValidationError::EmptyHeaderName,
                ValidationError::NoPickRetries,
            ]
        );
    }
}
