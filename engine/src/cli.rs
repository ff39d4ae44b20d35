//! CLI interface for the employee directory
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines the directory commands and the global flags shared by all of them.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Employee directory
///
/// Query and manage employees held by the remote employee service.
#[derive(Parser, Debug)]
#[command(name = "employee-directory")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every employee
    List,

    /// Find employees whose name contains a fragment (case-insensitive)
    Search {
        /// Name fragment; empty matches everyone
        fragment: String,
    },

    /// Show one employee
    Get {
        /// Employee ID
        id: String,
    },

    /// Show the highest salary in the directory
    HighestSalary,

    /// Show the names of the ten best-paid employees
    TopEarners,

    /// Create a new employee
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        salary: u32,

        #[arg(long)]
        age: u8,

        #[arg(long)]
        title: String,

        #[arg(long)]
        email: Option<String>,
    },

    /// Delete an employee and print the name it had
    Delete {
        /// Employee ID
        id: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate,
}
