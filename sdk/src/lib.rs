//! Directory SDK
//!
//! Shared data model and error taxonomy for the employee directory.
//! This crate performs no I/O; it is used by the engine and by anything that
//! sits in front of it (a routing layer, a CLI, tests).

/// Error types and handling
pub mod errors;

/// Employee records, envelopes and create requests
pub mod types;

// Re-export commonly used types
pub use errors::{DirectoryError, DirectoryErrorExt, FieldError};
pub use types::{CreateEmployeeRequest, CreatedEmployee, EmployeeListEnvelope, EmployeeRecord};
