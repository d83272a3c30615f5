//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GateConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Environment;

    #[test]
    fn empty_document_yields_defaults() {
        let config: GateConfig = toml::from_str("").unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.rate_limit.auth_sensitive.max_requests, 10);
    }

    #[test]
    fn unknown_environment_refuses_to_parse() {
        let err = toml::from_str::<GateConfig>("environment = \"staging\"");
        assert!(err.is_err());
    }

    #[test]
    fn scope_overrides_parse() {
        let config: GateConfig = toml::from_str(
            r#"
            environment = "production"

            [rate_limit.api]
            window_ms = 1000
            max_requests = 5
            key_strategy = "by_network_address"
            "#,
        )
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.rate_limit.api.max_requests, 5);
    }
}
