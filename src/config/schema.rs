//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// How dispatch work is scheduled.
    pub worker_pool: WorkerPoolConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Outbound client settings.
    pub client: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:10000".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Where dispatchers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingMode {
    /// On the thread that accepted the request.
    Inline,
    /// On a bounded pool of blocking workers.
    #[default]
    Pool,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    pub mode: SchedulingMode,

    /// Number of concurrent dispatches in pool mode.
    pub size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            mode: SchedulingMode::Pool,
            size: 16,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Outbound client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote endpoint as `host:port`. Every call goes here.
    pub endpoint: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Idle pooled connections kept per host.
    pub max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:10000".to_string(),
            connect_timeout_secs: 5,
            max_idle_per_host: 1,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:10000");
        assert_eq!(config.worker_pool.mode, SchedulingMode::Pool);
        assert_eq!(config.client.max_idle_per_host, 1);
    }

    #[test]
    fn test_partial_sections() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [worker_pool]
            mode = "inline"

            [observability]
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.worker_pool.mode, SchedulingMode::Inline);
        assert_eq!(config.worker_pool.size, 16);
        assert!(config.observability.json);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result: Result<BridgeConfig, _> = toml::from_str("[worker_pool]\nmode = \"threads\"\n");
        assert!(result.is_err());
    }
}
