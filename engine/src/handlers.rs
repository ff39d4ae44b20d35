//! Command handlers for CLI operations
//!
//! Each handler runs one directory operation and prints the result to
//! stdout, either as text or as pretty JSON:
//! - list / search: employee tables
//! - get: one employee
//! - highest-salary / top-earners: aggregate views
//! - create / delete: mutations
//! - config show / validate: configuration inspection

use anyhow::{Context, Result};
use directory_sdk::types::{CreateEmployeeRequest, EmployeeRecord};
use serde_json::json;
use std::path::Path;

use crate::config::Config;
use crate::service::DirectoryService;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One aligned text row for an employee
fn employee_row(employee: &EmployeeRecord) -> String {
    format!(
        "{:<38} {:<24} {:>10} {:>4}  {}",
        employee.id.as_deref().unwrap_or("-"),
        employee.name,
        employee.salary,
        employee.age,
        employee.title
    )
}

fn print_employees(employees: &[EmployeeRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if employees.is_empty() {
                println!("No employees found");
                return Ok(());
            }

            println!(
                "{:<38} {:<24} {:>10} {:>4}  TITLE",
                "ID", "NAME", "SALARY", "AGE"
            );
            for employee in employees {
                println!("{}", employee_row(employee));
            }
            println!();
            println!("{} employee(s)", employees.len());
        }
        OutputFormat::Json => print_json(&json!({ "data": employees }))?,
    }

    Ok(())
}

fn print_employee(employee: &EmployeeRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("ID:     {}", employee.id.as_deref().unwrap_or("-"));
            println!("Name:   {}", employee.name);
            println!("Salary: {}", employee.salary);
            println!("Age:    {}", employee.age);
            println!("Title:  {}", employee.title);
            if let Some(email) = &employee.email {
                println!("Email:  {}", email);
            }
        }
        OutputFormat::Json => print_json(&json!({ "data": employee }))?,
    }

    Ok(())
}

/// List every employee
pub async fn handle_list(service: &DirectoryService, format: OutputFormat) -> Result<()> {
    let employees = service
        .list_all()
        .await
        .context("Failed to list employees")?;
    print_employees(&employees, format)
}

/// Search employees by name fragment
pub async fn handle_search(
    service: &DirectoryService,
    fragment: &str,
    format: OutputFormat,
) -> Result<()> {
    let employees = service
        .search_by_name(fragment)
        .await
        .with_context(|| format!("Failed to search employees for '{}'", fragment))?;
    print_employees(&employees, format)
}

/// Show one employee
pub async fn handle_get(service: &DirectoryService, id: &str, format: OutputFormat) -> Result<()> {
    let employee = service
        .get_by_id(id)
        .await
        .with_context(|| format!("Failed to fetch employee {}", id))?;
    print_employee(&employee, format)
}

pub async fn handle_highest_salary(service: &DirectoryService, format: OutputFormat) -> Result<()> {
    let salary = service
        .highest_salary()
        .await
        .context("Failed to compute highest salary")?;

    match format {
        OutputFormat::Text => println!("Highest salary: {}", salary),
        OutputFormat::Json => print_json(&json!({ "highest_salary": salary }))?,
    }

    Ok(())
}

pub async fn handle_top_earners(service: &DirectoryService, format: OutputFormat) -> Result<()> {
    let names = service
        .top_ten_earners()
        .await
        .context("Failed to compute top earners")?;

    match format {
        OutputFormat::Text => {
            if names.is_empty() {
                println!("No employees found");
            }
            for (rank, name) in names.iter().enumerate() {
                println!("{:>2}. {}", rank + 1, name);
            }
        }
        OutputFormat::Json => print_json(&json!({ "top_earners": names }))?,
    }

    Ok(())
}

/// Create an employee and print the upstream copy
pub async fn handle_create(
    service: &DirectoryService,
    request: CreateEmployeeRequest,
    format: OutputFormat,
) -> Result<()> {
    let created = service
        .create(request)
        .await
        .context("Failed to create employee")?;

    if let OutputFormat::Text = format {
        println!("✓ Employee created");
        println!();
    }
    print_employee(&created, format)
}

/// Delete an employee and print the name it had
pub async fn handle_delete(
    service: &DirectoryService,
    id: &str,
    format: OutputFormat,
) -> Result<()> {
    let name = service
        .delete_by_id(id)
        .await
        .with_context(|| format!("Failed to delete employee {}", id))?;

    match format {
        OutputFormat::Text => println!("✓ Deleted {}", name),
        OutputFormat::Json => print_json(&json!({ "deleted": name }))?,
    }

    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("# {}", path.display());
            print!("{}", config.to_toml_string()?);
        }
        OutputFormat::Json => print_json(&json!({
            "path": path.display().to_string(),
            "config": serde_json::to_value(config)?,
        }))?,
    }

    Ok(())
}

/// Load and validate the configuration at `path`
pub fn handle_config_validate(path: &Path, format: OutputFormat) -> Result<()> {
    let result = Config::load_from_path(path);

    match format {
        OutputFormat::Text => match &result {
            Ok(_) => println!("✓ Configuration is valid: {}", path.display()),
            Err(e) => println!("✗ Configuration is invalid: {}", e),
        },
        OutputFormat::Json => print_json(&json!({
            "path": path.display().to_string(),
            "valid": result.is_ok(),
            "error": result.as_ref().err().map(ToString::to_string),
        }))?,
    }

    result
        .map(|_| ())
        .with_context(|| format!("Invalid configuration at {}", path.display()))
}
