//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool size > 0)
//! - Check addresses and levels parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use http::uri::Authority;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::{BridgeConfig, SchedulingMode};

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.max_body_bytes must be greater than zero")]
    MaxBodyBytes,

    #[error("worker_pool.size must be greater than zero in pool mode")]
    PoolSize,

    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,

    #[error("client.endpoint {0:?} is not a host:port pair")]
    Endpoint(String),

    #[error("client.connect_timeout_secs must be greater than zero")]
    ConnectTimeout,

    #[error("observability.log_level {0:?} is not a log level")]
    LogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::MaxBodyBytes);
    }

    if config.worker_pool.mode == SchedulingMode::Pool && config.worker_pool.size == 0 {
        errors.push(ValidationError::PoolSize);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    let endpoint_ok = config
        .client
        .endpoint
        .parse::<Authority>()
        .map(|authority| authority.port_u16().is_some())
        .unwrap_or(false);
    if !endpoint_ok {
        errors.push(ValidationError::Endpoint(config.client.endpoint.clone()));
    }
    if config.client.connect_timeout_secs == 0 {
        errors.push(ValidationError::ConnectTimeout);
    }

    if config.observability.log_level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
