//! Error types for fintrack-core
//!
//! Every failure that reaches the orchestration layer is one of these
//! variants. The first four mirror what the remote service can report
//! (transport, validation, not-found, unclassified server error); the rest
//! are raised on the client before any request is made.

use fintrack_config::ConfigError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used when neither the service nor the operation supplies one
pub const GENERIC_FAILURE: &str = "operation failed";

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Remote service unreachable
    Transport,
    /// Input rejected
    Validation,
    /// Referenced entity does not exist
    NotFound,
    /// Unclassified server failure
    Server,
    /// Malformed filter criteria
    InvalidFilter,
    /// Export could not be produced
    Export,
    /// Configuration error
    Config,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Server => "SERVER",
            ErrorCode::InvalidFilter => "INVALID_FILTER",
            ErrorCode::Export => "EXPORT",
            ErrorCode::Config => "CONFIG",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - operation may be affected
    Warning,
    /// Error - operation failed
    Error,
    /// Critical - client cannot operate
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for fintrack-core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        message: Option<String>,
    },

    #[error("Server error: {}", .message.as_deref().unwrap_or(GENERIC_FAILURE))]
    Server {
        status: Option<u16>,
        message: Option<String>,
    },

    #[error("Invalid filter: {message}")]
    InvalidFilter { field: &'static str, message: String },

    #[error("Export failed: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Transport { .. } => ErrorCode::Transport,
            CoreError::Validation { .. } => ErrorCode::Validation,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::Server { .. } => ErrorCode::Server,
            CoreError::InvalidFilter { .. } => ErrorCode::InvalidFilter,
            CoreError::Export { .. } => ErrorCode::Export,
            CoreError::Config { .. } => ErrorCode::Config,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::Transport { .. } => ErrorSeverity::Error,
            CoreError::Validation { .. } => ErrorSeverity::Warning,
            CoreError::NotFound { .. } => ErrorSeverity::Info,
            CoreError::Server { .. } => ErrorSeverity::Error,
            CoreError::InvalidFilter { .. } => ErrorSeverity::Warning,
            CoreError::Export { .. } => ErrorSeverity::Warning,
            CoreError::Config { .. } => ErrorSeverity::Critical,
        }
    }

    /// The human-readable message supplied with the failure, if any.
    ///
    /// Transport failures never carry one: there was no response to read it from.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            CoreError::Validation { message }
            | CoreError::InvalidFilter { message, .. }
            | CoreError::Export { message } => Some(message.as_str()),
            CoreError::NotFound { message, .. } | CoreError::Server { message, .. } => {
                message.as_deref()
            }
            CoreError::Transport { .. } | CoreError::Config { .. } => None,
        }
    }

    /// Message to show the user, falling back to `fallback` and then to
    /// [`GENERIC_FAILURE`].
    pub fn user_message(&self, fallback: &str) -> String {
        match self.service_message().filter(|m| !m.trim().is_empty()) {
            Some(message) => message.to_string(),
            None if !fallback.trim().is_empty() => fallback.to_string(),
            None => GENERIC_FAILURE.to_string(),
        }
    }

    /// What the user can do about the failure, where there is something
    pub fn hint(&self) -> Option<String> {
        match self {
            CoreError::Transport { .. } => {
                Some("check that the transaction service is running and api.base_url points at it".to_string())
            }
            CoreError::NotFound { resource, .. } => {
                Some(format!("{} may have been deleted; list transactions again", resource))
            }
            CoreError::InvalidFilter { field, .. } => match *field {
                "dates" => Some("the start date must not be after the end date".to_string()),
                "limit" => Some("use a page size of at least 1".to_string()),
                "page" => Some("pages are numbered from 1".to_string()),
                _ => None,
            },
            CoreError::Server { status: Some(status), .. } => {
                Some(format!("the service answered with status {}", status))
            }
            _ => None,
        }
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<ConfigError> for CoreError {
    fn from(error: ConfigError) -> Self {
        CoreError::Config {
            message: error.to_string(),
        }
    }
}

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Request token, when the operation is sequenced
    pub request_token: Option<u64>,
    /// Operation being performed
    pub operation: String,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_token: None,
            operation: operation.into(),
        }
    }

    /// Add request token
    pub fn with_request_token(mut self, token: u64) -> Self {
        self.request_token = Some(token);
        self
    }
}

/// Error logger trait
pub trait ErrorLogger: Send + Sync {
    /// Log an error
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
    /// Log a warning
    fn log_warning(&self, message: &str, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Debug, Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        let level = match error.severity() {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error | ErrorSeverity::Critical => log::Level::Error,
        };
        log::log!(
            target: "fintrack::error",
            level,
            "[{}] {} (operation={}, request={:?})",
            error.code(),
            error,
            context.operation,
            context.request_token
        );
    }

    fn log_warning(&self, message: &str, context: &ErrorContext) {
        log::warn!(
            target: "fintrack::error",
            "{} (operation={}, request={:?})",
            message,
            context.operation,
            context.request_token
        );
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::Transport.to_string(), "TRANSPORT");
        assert_eq!(ErrorCode::NotFound.to_string(), "NOT_FOUND");
        assert_eq!(ErrorCode::InvalidFilter.to_string(), "INVALID_FILTER");
    }

    #[test]
    fn test_error_severity() {
        let error = CoreError::Transport { message: "refused".to_string() };
        assert_eq!(error.severity(), ErrorSeverity::Error);

        let error = CoreError::Validation { message: "bad".to_string() };
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert_eq!(error.severity().to_string(), "warning");
    }

    #[test]
    fn test_service_message_is_used_verbatim() {
        let error = CoreError::Validation {
            message: "Amount must be positive".to_string(),
        };
        assert_eq!(error.user_message("Failed to create transaction"), "Amount must be positive");
    }

    #[test]
    fn test_transport_falls_back_to_operation_message() {
        let error = CoreError::Transport { message: "connection refused".to_string() };
        assert_eq!(error.service_message(), None);
        assert_eq!(error.user_message("Failed to fetch transactions"), "Failed to fetch transactions");
    }

    #[test]
    fn test_generic_fallback() {
        let error = CoreError::Server { status: Some(500), message: None };
        assert_eq!(error.user_message(""), GENERIC_FAILURE);
        assert_eq!(error.to_string(), "Server error: operation failed");
    }

    #[test]
    fn test_blank_service_message_is_ignored() {
        let error = CoreError::Server { status: Some(500), message: Some("  ".to_string()) };
        assert_eq!(error.user_message("Failed to fetch summary"), "Failed to fetch summary");
    }

    #[test]
    fn test_hints() {
        let error = CoreError::Transport { message: "timed out".to_string() };
        assert!(error.hint().unwrap().contains("api.base_url"));

        let error = CoreError::Server { status: Some(503), message: None };
        assert_eq!(error.hint().as_deref(), Some("the service answered with status 503"));

        let error = CoreError::Validation { message: "bad".to_string() };
        assert!(error.hint().is_none());

        let error = CoreError::InvalidFilter { field: "page", message: "page numbers start at 1".to_string() };
        assert_eq!(error.hint().as_deref(), Some("pages are numbered from 1"));
        assert_eq!(error.user_message("Failed to fetch transactions"), "page numbers start at 1");
    }

    #[test]
    fn test_error_context() {
        let context = ErrorContext::new("list").with_request_token(7);
        assert_eq!(context.operation, "list");
        assert_eq!(context.request_token, Some(7));
        assert_eq!(ErrorContext::new("summary").request_token, None);
    }

    #[test]
    fn test_from_config_error() {
        let error: CoreError = ConfigError::MissingField { field: "api.base_url".to_string() }.into();
        assert_eq!(error.code(), ErrorCode::Config);
        assert!(error.to_string().contains("api.base_url"));
    }
}
