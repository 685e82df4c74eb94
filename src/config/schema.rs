//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to defaults so a minimal file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::Signal;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GracefulConfig {
    /// Shutdown orchestration settings.
    pub shutdown: ShutdownConfig,

    /// HTTP server task settings.
    pub server: ServerConfig,

    /// Outbound polling client settings.
    pub client: ClientConfig,

    /// Request signing settings.
    pub security: SecurityConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Shutdown orchestration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long to wait for tasks after cancellation.
    pub drain_timeout_ms: u64,

    /// Cancel the root scope after this many seconds (demo binary only).
    pub lifetime_secs: Option<u64>,

    /// Signals that trigger shutdown.
    pub signals: Vec<Signal>,
}

impl ShutdownConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime_secs.map(Duration::from_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_ms: 1_000,
            lifetime_secs: Some(10),
            signals: vec![Signal::Terminate, Signal::Interrupt],
        }
    }
}

/// HTTP server task.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8180").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body buffered by middleware.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8180".to_string(),
            request_timeout_secs: 1,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Outbound polling client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URI polled by the client task.
    pub target: String,

    pub poll_interval_ms: u64,

    pub request_timeout_ms: u64,

    /// Gzip request bodies.
    pub compress: bool,
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            target: "http://127.0.0.1:8180/".to_string(),
            poll_interval_ms: 1_000,
            request_timeout_ms: 1_000,
            compress: false,
        }
    }
}

/// HMAC request signing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared HMAC-SHA256 key. Signing and verification are off when unset.
    pub hmac_key: Option<String>,

    /// Header carrying the hex signature.
    pub signature_header: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            hmac_key: None,
            signature_header: "HashSHA256".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
