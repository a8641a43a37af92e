//! Configuration errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable codes for configuration failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigErrorCode {
    FileNotFound,
    InvalidYaml,
    MissingField,
    InvalidValue,
    IoError,
}

impl std::fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            ConfigErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ConfigErrorCode::InvalidYaml => "INVALID_YAML",
            ConfigErrorCode::MissingField => "MISSING_FIELD",
            ConfigErrorCode::InvalidValue => "INVALID_VALUE",
            ConfigErrorCode::IoError => "IO_ERROR",
        };
        f.write_str(code)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("config is not valid YAML: {message}")]
    InvalidYaml { message: String },

    #[error("missing config value: {field}")]
    MissingField { field: String },

    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("could not read config file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn code(&self) -> ConfigErrorCode {
        match self {
            ConfigError::FileNotFound { .. } => ConfigErrorCode::FileNotFound,
            ConfigError::InvalidYaml { .. } => ConfigErrorCode::InvalidYaml,
            ConfigError::MissingField { .. } => ConfigErrorCode::MissingField,
            ConfigError::InvalidValue { .. } => ConfigErrorCode::InvalidValue,
            ConfigError::Io { .. } => ConfigErrorCode::IoError,
        }
    }

    /// The config key at fault, if the error concerns one
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingField { field } | ConfigError::InvalidValue { field, .. } => Some(field),
            _ => None,
        }
    }

    /// A hint for fixing the configuration
    pub fn hint(&self) -> Option<String> {
        match self {
            ConfigError::FileNotFound { .. } => {
                Some("run `fintrack init-config > fintrack.yaml` to start from the defaults".to_string())
            }
            ConfigError::MissingField { field } => Some(format!("set `{}` in the config file", field)),
            ConfigError::InvalidYaml { .. } => Some("compare against `fintrack init-config`".to_string()),
            _ => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
