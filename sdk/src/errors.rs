//! Error types and handling
//!
//! This module provides the error taxonomy shared by the directory engine and
//! anything that consumes it. Every error implements [`DirectoryErrorExt`],
//! which gives a user-safe hint, a recoverability flag and the HTTP status a
//! routing layer would map the error to.
//!
//! # Propagation
//!
//! - The remote client only ever produces `RemoteUnavailable` and
//!   `RemoteCallFailed`.
//! - The directory service adds `NotFound`, `InvalidRequest` and
//!   `ConcurrentModification`, and never swallows remote errors.
//!
//! # Examples
//!
//! ```
//! use directory_sdk::errors::{DirectoryError, DirectoryErrorExt};
//!
//! let error = DirectoryError::NotFound("42".to_string());
//! assert_eq!(error.status_hint(), 404);
//! assert!(error.is_recoverable());
//!
//! let open = DirectoryError::RemoteUnavailable("circuit breaker 'employee-api' is open".into());
//! assert_eq!(open.status_hint(), 503);
//! ```

use std::fmt;
use thiserror::Error;

/// Trait for directory error extensions
pub trait DirectoryErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint never contains upstream bodies, URLs or transport details.
    fn user_hint(&self) -> &str;

    /// Returns whether retrying the same call later could succeed
    fn is_recoverable(&self) -> bool;

    /// HTTP status a routing layer should answer with
    fn status_hint(&self) -> u16;
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Main directory error type
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Employee not found with ID: {0}")]
    NotFound(String),

    #[error("Invalid request: {}", join_fields(.0))]
    InvalidRequest(Vec<FieldError>),

    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote call failed{}: {cause}", status_suffix(.status))]
    RemoteCallFailed { status: Option<u16>, cause: String },

    #[error("Employee {0} was removed by another caller before it could be deleted")]
    ConcurrentModification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

impl DirectoryError {
    /// Upstream status carried by a failed remote call
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::RemoteCallFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Field errors carried by an invalid request
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::InvalidRequest(errors) => errors,
            _ => &[],
        }
    }
}

impl DirectoryErrorExt for DirectoryError {
    fn user_hint(&self) -> &str {
        match self {
            Self::NotFound(_) => "No employee exists with that ID",
            Self::InvalidRequest(_) => "Fix the listed fields and submit again",
            Self::RemoteUnavailable(_) => {
                "The employee service is unavailable. Try again shortly"
            }
            Self::RemoteCallFailed { status: Some(429), .. } => {
                "The employee service is rate limiting requests. Try again shortly"
            }
            Self::RemoteCallFailed { .. } => "The employee service returned an error",
            Self::ConcurrentModification(_) => {
                "The employee was changed by someone else. Refresh and retry"
            }
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) | Self::InvalidRequest(_) => false,
            Self::RemoteCallFailed {
                status: Some(code), ..
            } => *code == 408 || *code == 429 || *code >= 500,
            _ => true,
        }
    }

    fn status_hint(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidRequest(_) => 400,
            Self::RemoteUnavailable(_) => 503,
            Self::RemoteCallFailed {
                status: Some(429), ..
            } => 429,
            Self::RemoteCallFailed { .. } => 502,
            Self::ConcurrentModification(_) => 409,
            Self::Config(_) | Self::Io(_) => 500,
        }
    }
}
