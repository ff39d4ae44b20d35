//! Upstream employee API
//!
//! The [`EmployeeApi`] trait is the single seam between the directory
//! service and the remote employee-record service. [`RemoteDirectoryClient`]
//! implements it over HTTP; tests substitute in-memory doubles.

use async_trait::async_trait;
use directory_sdk::errors::DirectoryError;
use directory_sdk::types::{EmployeeListEnvelope, EmployeeRecord};

pub mod remote;

pub use remote::RemoteDirectoryClient;

/// Result type for upstream operations
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Operations offered by the upstream employee service
///
/// Implementations only ever fail with `RemoteUnavailable` or
/// `RemoteCallFailed`; interpreting empty data is left to callers.
#[async_trait]
pub trait EmployeeApi: Send + Sync {
    /// Every employee, in upstream order
    async fn list_all(&self) -> Result<Vec<EmployeeRecord>>;

    /// Envelope for `id`; no data means upstream has no such employee
    async fn get_by_id(&self, id: &str) -> Result<EmployeeListEnvelope>;

    /// Create `record` and return the upstream copy with its assigned id
    async fn create(&self, record: &EmployeeRecord) -> Result<EmployeeRecord>;

    async fn delete_by_id(&self, id: &str) -> Result<()>;
}
