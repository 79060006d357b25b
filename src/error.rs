//! Error types for teamboard
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad credentials, missing role record, bad args)
//! - 3: Blocked by policy (permission denied for the operation)
//! - 4: Operation failed (store write rejected, IO, serialization)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the teamboard CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for teamboard operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Already registered: {0}")]
    RegistrationConflict(String),

    #[error("No role record found for user {0}")]
    NoRoleRecord(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Reauthentication required before changing password")]
    StaleReauthentication,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    // Policy blocks (exit code 3)
    #[error("Permission denied: {operation} requires {requirement}")]
    PermissionDenied {
        operation: String,
        requirement: String,
    },

    // Operation failures (exit code 4)
    #[error("Mutation rejected: {0}")]
    MutationRejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidCredentials
            | Error::RegistrationConflict(_)
            | Error::NoRoleRecord(_)
            | Error::NotSignedIn
            | Error::StaleReauthentication
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::NotFound(_) => exit_codes::USER_ERROR,

            // Policy blocks
            Error::PermissionDenied { .. } => exit_codes::POLICY_BLOCKED,

            // Operation failures
            Error::MutationRejected(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON output, if any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::PermissionDenied {
                operation,
                requirement,
            } => Some(serde_json::json!({
                "operation": operation,
                "requirement": requirement,
            })),
            _ => None,
        }
    }
}

/// Result type alias for teamboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
