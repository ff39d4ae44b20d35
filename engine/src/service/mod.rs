//! Directory service
//!
//! Stateless query and workflow layer over an [`EmployeeApi`]. Every
//! operation that needs "all employees" fetches the list fresh; nothing is
//! cached between calls. Upstream errors propagate unchanged apart from the
//! two translations this layer owns: empty lookup data becomes `NotFound`,
//! and a 404 on the delete step becomes `ConcurrentModification`.

use directory_sdk::errors::DirectoryError;
use directory_sdk::types::{CreateEmployeeRequest, EmployeeRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{EmployeeApi, Result};

pub mod aggregate;

/// How many names `top_ten_earners` reports
pub const TOP_EARNERS_LIMIT: usize = 10;

#[derive(Clone)]
pub struct DirectoryService {
    api: Arc<dyn EmployeeApi>,
}

impl DirectoryService {
    pub fn new(api: Arc<dyn EmployeeApi>) -> Self {
        Self { api }
    }

    pub async fn list_all(&self) -> Result<Vec<EmployeeRecord>> {
        self.api.list_all().await
    }

    /// Employees whose name contains `fragment`, ignoring case, in upstream order
    pub async fn search_by_name(&self, fragment: &str) -> Result<Vec<EmployeeRecord>> {
        let employees = self.api.list_all().await?;
        let total = employees.len();
        let matches = aggregate::filter_by_name(employees, fragment);
        debug!(fragment, total, matched = matches.len(), "Searched employees by name");
        Ok(matches)
    }

    /// The employee with `id`
    ///
    /// # Errors
    ///
    /// `NotFound` when `id` is blank or upstream returns no data for it.
    /// A blank id never reaches upstream, where it would address the
    /// collection instead of a record.
    pub async fn get_by_id(&self, id: &str) -> Result<EmployeeRecord> {
        if id.trim().is_empty() {
            return Err(DirectoryError::NotFound(id.to_string()));
        }

        self.api
            .get_by_id(id)
            .await?
            .into_first()
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }

    /// Highest salary across all employees, 0 when there are none
    pub async fn highest_salary(&self) -> Result<u32> {
        let employees = self.api.list_all().await?;
        Ok(aggregate::max_salary(&employees))
    }

    /// Names of up to ten best-paid employees, highest salary first
    pub async fn top_ten_earners(&self) -> Result<Vec<String>> {
        let employees = self.api.list_all().await?;
        Ok(aggregate::top_earners(&employees, TOP_EARNERS_LIMIT))
    }

    /// Validate `request` and create it upstream
    ///
    /// Invalid requests never reach upstream.
    pub async fn create(&self, request: CreateEmployeeRequest) -> Result<EmployeeRecord> {
        request.validate()?;

        let created = self.api.create(&request.into_candidate()).await?;
        info!(id = ?created.id, name = %created.name, "Employee created");
        Ok(created)
    }

    /// Delete the employee with `id` and return the name it had
    ///
    /// The record is fetched first so the reported name is accurate and a
    /// missing id fails with `NotFound` before any delete is issued.
    ///
    /// # Errors
    ///
    /// - `NotFound` when no employee has `id`
    /// - `ConcurrentModification` when the record vanished between the
    ///   lookup and the delete
    pub async fn delete_by_id(&self, id: &str) -> Result<String> {
        let existing = self.get_by_id(id).await?;
        let target = existing.id.as_deref().unwrap_or(id);

        match self.api.delete_by_id(target).await {
            Ok(()) => {
                info!(id = target, name = %existing.name, "Employee deleted");
                Ok(existing.name)
            }
            Err(err) if err.upstream_status() == Some(404) => {
                warn!(id = target, "Employee disappeared before delete");
                Err(DirectoryError::ConcurrentModification(target.to_string()))
            }
            Err(err) => Err(err),
        }
    }
}
