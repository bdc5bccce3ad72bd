//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every backend is an absolute `http://` URL
//! - Validate value ranges (intervals and timeouts > 0, addresses parse)
//! - Reject selection strategies that are not implemented
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LbConfig → Result<(), Vec<ValidationError>>
//! - An empty backend list is accepted; every request then gets 503

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::LbConfig;
use crate::load_balancer::Strategy;

pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported load balancing strategy '{0}'")]
    UnsupportedStrategy(String),

    #[error("invalid backend '{server}': {reason}")]
    InvalidServer { server: String, reason: String },

    #[error("invalid listener bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("timeouts.client_idle_secs ({idle}) must not be shorter than timeouts.request_secs ({request})")]
    ClientIdleBelowRequest { idle: u64, request: u64 },

    #[error("health check path '{0}' must start with '/'")]
    InvalidHealthPath(String),

    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &LbConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.strategy.parse::<Strategy>().is_err() {
        errors.push(ValidationError::UnsupportedStrategy(config.strategy.clone()));
    }

    if config.servers.is_empty() {
        tracing::warn!("No backend servers configured; every request will be rejected with 503");
    }
    for server in &config.servers {
        if let Err(reason) = check_server(server) {
            errors.push(ValidationError::InvalidServer {
                server: server.clone(),
                reason,
            });
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let health = &config.health_check;
    if health.interval_ms == 0 {
        errors.push(ValidationError::ZeroDuration("health_check.interval_ms"));
    }
    if health.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration("health_check.timeout_ms"));
    }
    if !health.path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath(health.path.clone()));
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.request_secs", timeouts.request_secs),
        ("timeouts.upstream_secs", timeouts.upstream_secs),
        ("timeouts.header_read_secs", timeouts.header_read_secs),
        ("timeouts.write_secs", timeouts.write_secs),
        ("timeouts.client_idle_secs", timeouts.client_idle_secs),
        ("timeouts.drain_secs", timeouts.drain_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(name));
        }
    }
    // The idle deadline also runs while a request waits on its backend.
    if timeouts.client_idle_secs > 0 && timeouts.client_idle_secs < timeouts.request_secs {
        errors.push(ValidationError::ClientIdleBelowRequest {
            idle: timeouts.client_idle_secs,
            request: timeouts.request_secs,
        });
    }

    let observability = &config.observability;
    if !VALID_LOG_LEVELS
        .iter()
        .any(|lvl| lvl.eq_ignore_ascii_case(&observability.log_level))
    {
        errors.push(ValidationError::InvalidLogLevel(
            observability.log_level.clone(),
        ));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_server(server: &str) -> Result<(), String> {
    let url = Url::parse(server).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("scheme '{}' is not supported", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("base URL must not carry a query or fragment".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(servers: &[&str]) -> LbConfig {
        LbConfig {
            servers: servers.iter().map(|s| s.to_string()).collect(),
            ..LbConfig::default()
        }
    }

    #[test]
    fn default_config_with_backends_is_valid() {
        let config = config_with(&["http://127.0.0.1:8081", "http://backend.internal:80/api"]);
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn empty_backend_list_is_accepted() {
        assert_eq!(validate_config(&config_with(&[])), Ok(()));
    }

    #[test]
    fn rejects_non_http_backends() {
        let config = config_with(&["https://127.0.0.1:8443", "127.0.0.1:8081"]);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::InvalidServer { .. })));
    }

    #[test]
    fn collects_every_error() {
        let mut config = config_with(&["http://127.0.0.1:8081"]);
        config.strategy = "weighted".into();
        config.listener.bind_address = "not-an-address".into();
        config.health_check.interval_ms = 0;
        config.health_check.path = "health".into();
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::UnsupportedStrategy("weighted".into())));
        assert!(errors.contains(&ValidationError::InvalidBindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::ZeroDuration("health_check.interval_ms")));
        assert!(errors.contains(&ValidationError::InvalidHealthPath("health".into())));
        assert!(errors.contains(&ValidationError::InvalidLogLevel("loud".into())));
    }

    #[test]
    fn edge_timeouts_are_checked() {
        let mut config = config_with(&["http://127.0.0.1:8081"]);
        config.timeouts.header_read_secs = 0;
        config.timeouts.request_secs = 30;
        config.timeouts.client_idle_secs = 10;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroDuration("timeouts.header_read_secs"),
                ValidationError::ClientIdleBelowRequest {
                    idle: 10,
                    request: 30
                },
            ]
        );
    }

    #[test]
    fn strategy_aliases_are_accepted() {
        for strategy in ["round-robin", "round_robin", "rr", "Round-Robin"] {
            let mut config = config_with(&["http://127.0.0.1:8081"]);
            config.strategy = strategy.into();
            assert_eq!(validate_config(&config), Ok(()), "strategy {strategy}");
        }
    }
}
