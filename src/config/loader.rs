//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::LbConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse JSON config {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not parse TOML config {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a file.
///
/// Files ending in `.toml` are parsed as TOML, anything else as JSON.
pub fn load_config(path: &Path) -> Result<LbConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = parse_config(path, &content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_config(path: &Path, content: &str) -> Result<LbConfig, ConfigError> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_minimal_json_config() {
        let file = write_temp(
            ".json",
            r#"{
                "servers": ["http://localhost:8081", "http://localhost:8082"],
                "strategy": "round-robin"
            }"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.servers,
            vec!["http://localhost:8081", "http://localhost:8082"]
        );
        assert_eq!(config.strategy, "round-robin");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.health_check.interval_ms, 5_000);
        assert_eq!(config.timeouts.drain_secs, 30);
    }

    #[test]
    fn loads_toml_config_with_sections() {
        let file = write_temp(
            ".toml",
            r#"
servers = ["http://10.0.0.1:3000"]
strategy = "rr"

[listener]
bind_address = "127.0.0.1:9000"

[health_check]
interval_ms = 250
path = "/ready"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.health_check.interval_ms, 250);
        assert_eq!(config.health_check.path, "/ready");
        assert_eq!(config.health_check.timeout_ms, 2_000);
    }

    #[test]
    fn rejects_malformed_json() {
        let file = write_temp(".json", "{invalid_json}");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn unknown_strategy_fails_validation() {
        let file = write_temp(
            ".json",
            r#"{"servers": ["http://localhost:8081"], "strategy": "least-connections"}"#,
        );
        let err = load_config(file.path()).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, ValidationError::UnsupportedStrategy(_))));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
