//! Configuration management
//!
//! This module handles loading, validation, and management of the directory
//! configuration. Configuration is stored in TOML format at
//! ~/.employee-directory/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **upstream**: Base URL and transport settings of the employee service
//! - **resilience**: Which named retry policy and circuit breaker guard the
//!   single-employee operations
//! - **retry.<name>**: Named retry policies
//! - **circuit_breaker.<name>**: Named circuit breakers
//!
//! # Examples
//!
//! ```no_run
//! use employee_directory::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Upstream: {}", config.upstream.base_url);
//! # Ok(())
//! # }
//! ```

use directory_sdk::errors::DirectoryError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the policy pair guarding the employee API when nothing else is configured
pub const DEFAULT_POLICY_NAME: &str = "employee-api";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Upstream employee service
    pub upstream: UpstreamConfig,

    /// Policy selection for guarded calls
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Named retry policies
    #[serde(default = "default_retry_policies")]
    pub retry: BTreeMap<String, RetryConfig>,

    /// Named circuit breakers
    #[serde(default = "default_circuit_breakers")]
    pub circuit_breaker: BTreeMap<String, CircuitBreakerConfig>,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Upstream employee service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the employee service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP connect timeout (seconds); the only transport-level timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// User-Agent header sent upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: None,
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Which named policies guard get-by-id, create and delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Retry policy name
    #[serde(default = "default_policy_name")]
    pub retry: String,

    /// Circuit breaker name
    #[serde(default = "default_policy_name")]
    pub circuit_breaker: String,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retry: default_policy_name(),
            circuit_breaker: default_policy_name(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the second attempt (milliseconds)
    #[serde(default = "default_wait_duration_ms")]
    pub wait_duration_ms: u64,

    /// Growth factor applied to the wait after each attempt (1.0 = fixed)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for a single wait (milliseconds)
    #[serde(default = "default_max_wait_duration_ms")]
    pub max_wait_duration_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            wait_duration_ms: default_wait_duration_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_wait_duration_ms: default_max_wait_duration_ms(),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failure rate (percent) at or above which the breaker opens
    #[serde(default = "default_failure_rate_threshold")]
    pub failure_rate_threshold: f64,

    /// Number of most recent outcomes considered
    #[serde(default = "default_sliding_window_size")]
    pub sliding_window_size: u32,

    /// Outcomes required before the failure rate is evaluated
    #[serde(default = "default_minimum_number_of_calls")]
    pub minimum_number_of_calls: u32,

    /// How long the breaker stays open before admitting trial calls (milliseconds)
    #[serde(default = "default_wait_duration_in_open_state_ms")]
    pub wait_duration_in_open_state_ms: u64,

    /// Trial calls admitted while half-open
    #[serde(default = "default_permitted_calls_in_half_open_state")]
    pub permitted_calls_in_half_open_state: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: default_failure_rate_threshold(),
            sliding_window_size: default_sliding_window_size(),
            minimum_number_of_calls: default_minimum_number_of_calls(),
            wait_duration_in_open_state_ms: default_wait_duration_in_open_state_ms(),
            permitted_calls_in_half_open_state: default_permitted_calls_in_half_open_state(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8112/api/v1/employee".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_policy_name() -> String {
    DEFAULT_POLICY_NAME.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_wait_duration_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_wait_duration_ms() -> u64 {
    10_000
}

fn default_failure_rate_threshold() -> f64 {
    50.0
}

fn default_sliding_window_size() -> u32 {
    100
}

fn default_minimum_number_of_calls() -> u32 {
    100
}

fn default_wait_duration_in_open_state_ms() -> u64 {
    60_000
}

fn default_permitted_calls_in_half_open_state() -> u32 {
    10
}

fn default_retry_policies() -> BTreeMap<String, RetryConfig> {
    BTreeMap::from([(default_policy_name(), RetryConfig::default())])
}

fn default_circuit_breakers() -> BTreeMap<String, CircuitBreakerConfig> {
    BTreeMap::from([(default_policy_name(), CircuitBreakerConfig::default())])
}

impl Config {
    /// Load configuration from the default location (~/.employee-directory/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, DirectoryError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, DirectoryError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| DirectoryError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, DirectoryError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| DirectoryError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, DirectoryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DirectoryError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        config.validate()?;

        let toml_string = config.to_toml_string()?;

        fs::write(path, toml_string)
            .map_err(|e| DirectoryError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Render the configuration as pretty TOML
    pub fn to_toml_string(&self) -> Result<String, DirectoryError> {
        toml::to_string_pretty(self)
            .map_err(|e| DirectoryError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Get the default configuration file path (~/.employee-directory/config.toml)
    pub fn default_config_path() -> Result<PathBuf, DirectoryError> {
        let home = dirs::home_dir().ok_or_else(|| {
            DirectoryError::Config("Could not determine home directory".to_string())
        })?;

        Ok(home.join(".employee-directory").join("config.toml"))
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The log level is unknown
    /// - The upstream base URL is not an absolute http(s) URL
    /// - Any named retry policy or circuit breaker has out-of-range values
    pub fn validate(&self) -> Result<(), DirectoryError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(DirectoryError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        self.upstream.parsed_base_url()?;

        for (name, retry) in &self.retry {
            if retry.max_attempts == 0 {
                return Err(DirectoryError::Config(format!(
                    "retry.{}.max_attempts must be at least 1",
                    name
                )));
            }
            if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
                return Err(DirectoryError::Config(format!(
                    "retry.{}.backoff_multiplier must be 1.0 or greater",
                    name
                )));
            }
        }

        for (name, breaker) in &self.circuit_breaker {
            if !(breaker.failure_rate_threshold > 0.0 && breaker.failure_rate_threshold <= 100.0)
            {
                return Err(DirectoryError::Config(format!(
                    "circuit_breaker.{}.failure_rate_threshold must be in (0, 100]",
                    name
                )));
            }
            if breaker.sliding_window_size == 0 || breaker.minimum_number_of_calls == 0 {
                return Err(DirectoryError::Config(format!(
                    "circuit_breaker.{}: sliding_window_size and minimum_number_of_calls must be at least 1",
                    name
                )));
            }
            if breaker.permitted_calls_in_half_open_state == 0 {
                return Err(DirectoryError::Config(format!(
                    "circuit_breaker.{}.permitted_calls_in_half_open_state must be at least 1",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl UpstreamConfig {
    /// Parse the base URL, requiring an absolute http or https URL
    pub fn parsed_base_url(&self) -> Result<Url, DirectoryError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            DirectoryError::Config(format!("Invalid upstream base_url '{}': {}", self.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(DirectoryError::Config(format!(
                "Upstream base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        Ok(url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            upstream: UpstreamConfig::default(),
            resilience: ResilienceConfig::default(),
            retry: default_retry_policies(),
            circuit_breaker: default_circuit_breakers(),
        }
    }
}
