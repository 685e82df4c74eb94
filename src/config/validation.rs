//! Semantic configuration checks beyond what serde enforces.

use std::net::SocketAddr;

use axum::http::{HeaderName, Uri};
use thiserror::Error;

use crate::config::schema::GracefulConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every rule and report all failures at once.
pub fn validate_config(config: &GracefulConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.shutdown.drain_timeout_ms == 0 {
        errors.push(ValidationError::new("shutdown.drain_timeout_ms", "must be greater than zero"));
    }

    if let Err(e) = config.server.bind_address.parse::<SocketAddr>() {
        errors.push(ValidationError::new("server.bind_address", e.to_string()));
    }

    match config.client.target.parse::<Uri>() {
        Ok(uri) if uri.scheme().is_none() || uri.authority().is_none() => {
            errors.push(ValidationError::new("client.target", "must be an absolute URI"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("client.target", e.to_string())),
    }

    if config.client.poll_interval_ms == 0 {
        errors.push(ValidationError::new("client.poll_interval_ms", "must be greater than zero"));
    }

    if let Err(e) = HeaderName::from_bytes(config.security.signature_header.as_bytes()) {
        errors.push(ValidationError::new("security.signature_header", e.to_string()));
    }

    if config.observability.metrics_enabled {
        if let Err(e) = config.observability.metrics_address.parse::<SocketAddr>() {
            errors.push(ValidationError::new("observability.metrics_address", e.to_string()));
        }
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
    fn defaults_are_valid() {
        assert!(validate_config(&GracefulConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = GracefulConfig::default();
        config.shutdown.drain_timeout_ms = 0;
        config.server.bind_address = "not-an-address".into();
        config.client.target = "/relative".into();
        config.security.signature_header = String::new();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "shutdown.drain_timeout_ms",
                "server.bind_address",
                "client.target",
                "security.signature_header",
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = GracefulConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
