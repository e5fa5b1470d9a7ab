use miette::Diagnostic;
use thiserror::Error;

/// Message shown to callers for any failure that is not their own input.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to handle prompt";

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Validation error: {0}")]
    #[diagnostic(code(calendar_pilot::validation))]
    Validation(String),

    #[error("Unsupported operation: {0}")]
    #[diagnostic(code(calendar_pilot::unsupported_operation))]
    UnsupportedOperation(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(calendar_pilot::google_calendar))]
    GoogleCalendar(String),

    #[error("Intent extraction error: {0}")]
    #[diagnostic(code(calendar_pilot::intent))]
    Intent(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(calendar_pilot::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(calendar_pilot::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(calendar_pilot::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(calendar_pilot::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(calendar_pilot::other))]
    Other(String),
}

impl Error {
    /// True when the failure was caused by the caller's input rather than a collaborator
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::UnsupportedOperation(_))
    }

    /// Text that is safe to hand back to the caller.
    ///
    /// Validation problems are described as-is; everything else collapses to a
    /// generic message so upstream payloads never leak.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(message) => message.clone(),
            Error::UnsupportedOperation(name) => format!("Unsupported operation: {}", name),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create validation errors
pub fn validation_error(message: &str) -> Error {
    Error::Validation(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create intent extraction errors
pub fn intent_error(message: &str) -> Error {
    Error::Intent(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
