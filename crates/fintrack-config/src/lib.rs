//! Configuration management for fintrack
//!
//! This module handles loading, validation, and management of
//! fintrack configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use error::ConfigError;

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "FINTRACK_API_URL";

// ==================== Configuration Types ====================

/// Remote transaction service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL all endpoint paths are joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Records requested per list page
    #[serde(default = "default_records_per_page")]
    pub records_per_page: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            records_per_page: default_records_per_page(),
        }
    }
}

fn default_records_per_page() -> u32 {
    50
}

/// Notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Delay in milliseconds before an auto-removing notification expires
    #[serde(default = "default_expiry_ms")]
    pub expiry_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            expiry_ms: default_expiry_ms(),
        }
    }
}

fn default_expiry_ms() -> u64 {
    5000
}

/// How the held transaction list reacts to a successful mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPolicy {
    /// Apply the active filter client-side to decide what stays in the list
    FilterLocally,
    /// Re-run the list query with the active filter
    Refetch,
}

impl Default for MutationPolicy {
    fn default() -> Self {
        MutationPolicy::FilterLocally
    }
}

impl std::str::FromStr for MutationPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "filter_locally" | "local" => Ok(MutationPolicy::FilterLocally),
            "refetch" => Ok(MutationPolicy::Refetch),
            _ => Err(format!("Invalid mutation policy: {}", s)),
        }
    }
}

impl std::fmt::Display for MutationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationPolicy::FilterLocally => write!(f, "filter_locally"),
            MutationPolicy::Refetch => write!(f, "refetch"),
        }
    }
}

/// Cache behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub mutation_policy: MutationPolicy,
    /// Refresh summary and analytics after every successful mutation
    #[serde(default = "default_true")]
    pub refresh_aggregates: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mutation_policy: MutationPolicy::default(),
            refresh_aggregates: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Export formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// chrono format string for the date column
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Number of decimal places in the amount column
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            decimal_places: default_decimal_places(),
        }
    }
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

/// Colour theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}

impl std::str::FromStr for Theme {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(format!("Invalid theme: {}", s)),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// Initial transient UI settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UiConfig {
    #[serde(default)]
    pub theme: Theme,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote service settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Cache behaviour
    #[serde(default)]
    pub cache: CacheConfig,
    /// Export formatting
    #[serde(default)]
    pub export: ExportConfig,
    /// Transient UI defaults
    #[serde(default)]
    pub ui: UiConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            },
            _ => ConfigError::Io {
                path: path.to_string_lossy().to_string(),
                source: e,
            },
        })?;

        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                log::debug!("{} overrides api.base_url with {}", API_URL_ENV, url);
                self.api.base_url = url.trim().to_string();
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "api.base_url".to_string(),
            });
        }

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                reason: "Base URL must start with http:// or https://".to_string(),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if self.pagination.records_per_page == 0 || self.pagination.records_per_page > 500 {
            return Err(ConfigError::InvalidValue {
                field: "pagination.records_per_page".to_string(),
                reason: "Records per page must be between 1 and 500".to_string(),
            });
        }

        if self.notifications.expiry_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notifications.expiry_ms".to_string(),
                reason: "Expiry must be greater than 0".to_string(),
            });
        }

        if self.export.decimal_places > 10 {
            return Err(ConfigError::InvalidValue {
                field: "export.decimal_places".to_string(),
                reason: "Decimal places must be between 0 and 10".to_string(),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Notification expiry as a duration
    pub fn notification_expiry(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.notifications.expiry_ms)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.api.timeout_secs)
    }
}

// ==================== Tests ====================
