// Employee directory
// Main entry point for the employee-directory binary

use clap::Parser;
use directory_sdk::errors::{DirectoryError, DirectoryErrorExt};
use directory_sdk::types::CreateEmployeeRequest;
use employee_directory::cli::{Cli, Command, ConfigAction};
use employee_directory::client::RemoteDirectoryClient;
use employee_directory::config::Config;
use employee_directory::handlers::{
    handle_config_show, handle_config_validate, handle_create, handle_delete, handle_get,
    handle_highest_salary, handle_list, handle_search, handle_top_earners, OutputFormat,
};
use employee_directory::resilience::PolicyRegistry;
use employee_directory::service::DirectoryService;
use employee_directory::telemetry::{init_telemetry, init_telemetry_with_level};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // No-op when run() already installed the configured subscriber
            init_telemetry();
            tracing::error!(error = %format!("{:#}", err), "Command failed");
            match err.downcast_ref::<DirectoryError>() {
                Some(directory_err) => eprintln!("Error: {}", directory_err.user_hint()),
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };

    // Validation reports on the file itself, so it must not require a loadable config
    if let Command::Config {
        action: ConfigAction::Validate,
    } = cli.command
    {
        return handle_config_validate(&config_path, format);
    }

    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Employee directory v{} ({} - {})", version, commit, timestamp);

    let registry = Arc::new(PolicyRegistry::from_config(&config));
    let client = RemoteDirectoryClient::from_config(&config, Arc::clone(&registry))?;
    tracing::debug!(base_url = %client.base_url(), "Upstream client ready");
    let service = DirectoryService::new(Arc::new(client));

    match cli.command {
        Command::List => handle_list(&service, format).await,

        Command::Search { fragment } => {
            tracing::info!("Searching employees for '{}'", fragment);
            handle_search(&service, &fragment, format).await
        }

        Command::Get { id } => handle_get(&service, &id, format).await,

        Command::HighestSalary => handle_highest_salary(&service, format).await,

        Command::TopEarners => handle_top_earners(&service, format).await,

        Command::Create {
            name,
            salary,
            age,
            title,
            email,
        } => {
            let request = CreateEmployeeRequest {
                name,
                salary,
                age,
                title,
                email,
            };
            handle_create(&service, request, format).await
        }

        Command::Delete { id } => {
            tracing::info!("Deleting employee {}", id);
            handle_delete(&service, &id, format).await
        }

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, &config_path, format),
            ConfigAction::Validate => handle_config_validate(&config_path, format),
        },
    }
}
