//! Options loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::OwlConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for options loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate options from a TOML file.
pub fn load_config(path: &Path) -> Result<OwlConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate options from TOML text.
pub fn parse_config(content: &str) -> Result<OwlConfig, ConfigError> {
    let config: OwlConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("owl-config-{}.toml", std::process::id()));
        fs::write(&path, "[watch]\ngrace_period_ms = 50\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.watch.grace_period_ms, 50);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_parse_and_validation_errors() {
        assert!(matches!(parse_config("[store"), Err(ConfigError::Parse(_))));

        let err = parse_config("[store]\nwait_secs = 9000\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref v) if v.len() == 1));
        assert!(err.to_string().contains("wait_secs"));
    }
}
