use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("HTTP {status}: {reason}")]
    HttpStatusError { status: u16, reason: String },

    #[error("HTTP {status} - {excerpt}")]
    RemoteError { status: u16, excerpt: String },

    #[error("Malformed response: {message}")]
    MalformedResponseError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Update rejected: {message}")]
    RejectedError { message: String },

    #[error("Popup blocked or failed to open: {message}")]
    PopupBlockedError { message: String },

    #[error("Clipboard error: {message}")]
    ClipboardError { message: String },

    #[error("Unknown action '{name}'. Available actions: {available}")]
    UnknownActionError { name: String, available: String },

    #[error("{message}")]
    UsageError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Server,
    Data,
    Configuration,
    Input,
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConsoleError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponseError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) => ErrorCategory::Network,
            Self::HttpStatusError { .. }
            | Self::RemoteError { .. }
            | Self::RejectedError { .. } => ErrorCategory::Server,
            Self::MalformedResponseError { .. } | Self::SerializationError(_) => {
                ErrorCategory::Data
            }
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. }
            | Self::UnknownActionError { .. }
            | Self::UsageError { .. } => ErrorCategory::Input,
            Self::IoError(_) | Self::PopupBlockedError { .. } | Self::ClipboardError { .. } => {
                ErrorCategory::Environment
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Server => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Environment => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ApiError(_) => "Check that the automation service is running and reachable",
            Self::HttpStatusError { .. } | Self::RemoteError { .. } => {
                "Inspect the webhook execution log on the automation service"
            }
            Self::RejectedError { .. } => "Reload the records and retry the edit on fresh data",
            Self::MalformedResponseError { .. } | Self::SerializationError(_) => {
                "Verify the webhook responds with the expected JSON shape"
            }
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => "Fix the configuration file and restart",
            Self::ValidationError { .. } => "Correct the input value and try again",
            Self::PopupBlockedError { .. } => "Use the preview or download action instead",
            Self::ClipboardError { .. } => {
                "Check that a desktop clipboard is available or copy the preview manually"
            }
            Self::IoError(_) => "Check file paths and permissions",
            Self::UnknownActionError { .. } | Self::UsageError { .. } => {
                "Run 'help' to list available actions"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError(e) if e.is_connect() => {
                "Could not connect to the webhook service".to_string()
            }
            Self::ApiError(e) if e.is_timeout() => "The webhook service timed out".to_string(),
            Self::ValidationError { message } => message.clone(),
            Self::UsageError { message } => message.clone(),
            Self::RejectedError { message } => format!("Failed to save: {}", message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_low_severity() {
        let err = ConsoleError::validation("Must be a number");
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.user_friendly_message(), "Must be a number");
    }

    #[test]
    fn test_http_status_display() {
        let err = ConsoleError::HttpStatusError {
            status: 502,
            reason: "Bad Gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = ConsoleError::MissingConfigError {
            field: "webhooks.processing".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
