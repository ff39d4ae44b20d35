//! Employee Directory Engine Library
//!
//! This library provides the resilient upstream client, the directory
//! service and the CLI plumbing of the employee directory.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Telemetry and Observability
pub mod telemetry;

/// Retry and circuit breaker policies for upstream calls
pub mod resilience;

/// Upstream employee API client
pub mod client;

/// Directory queries, aggregates and workflows
pub mod service;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
