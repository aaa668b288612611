// models/src/errors.rs
pub use thiserror::Error;
use serde::{Serialize, Deserialize};

/// Request-level error taxonomy. Every variant is recovered at the HTTP
/// boundary and turned into a redirect or an inline message; nothing here
/// is fatal to the process.
#[derive(Debug, Serialize, Deserialize, Error, Clone, PartialEq)]
pub enum ClinicError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("session references a doctor that no longer exists")]
    StaleSession,
    #[error("Validation error: {0}")]
    Validation(ValidationError),
    #[error("record not found or you do not have permission to access it")]
    NotFoundOrForeign,
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("An internal error occurred: {0}")]
    Internal(String),
}

impl From<&str> for ClinicError {
    fn from(error: &str) -> Self {
        ClinicError::Internal(error.to_string())
    }
}

impl From<ValidationError> for ClinicError {
    fn from(err: ValidationError) -> Self {
        ClinicError::Validation(err)
    }
}

impl From<serde_json::Error> for ClinicError {
    fn from(err: serde_json::Error) -> Self {
        ClinicError::Serialization(format!("JSON serialization error: {}", err))
    }
}

#[derive(Debug, Serialize, Deserialize, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("required field {0} is missing")]
    MissingField(String),
    #[error("amount must be a positive number")]
    InvalidAmount,
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("password confirmation does not match")]
    PasswordMismatch,
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),
    #[error("'{0}' is not a recognized status")]
    UnknownStatus(String),
    #[error("invalid value for field {0}")]
    InvalidValue(String),
}

impl ValidationError {
    pub fn missing(field: &str) -> Self {
        ValidationError::MissingField(field.to_string())
    }
}

/// A type alias for a `Result` that returns a `ClinicError` on failure.
pub type ClinicResult<T> = Result<T, ClinicError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_converts_to_clinic_error() {
        let err: ClinicError = ValidationError::InvalidAmount.into();
        assert_eq!(err, ClinicError::Validation(ValidationError::InvalidAmount));
    }

    #[test]
    fn not_found_message_does_not_reveal_ownership() {
        // The same variant serves "missing" and "belongs to someone else",
        // so its message must not distinguish the two.
        let msg = ClinicError::NotFoundOrForeign.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("permission"));
    }
}
