//! Config and dataset loading shared by the mining commands.

use std::fs;

use basketry_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use basketry_core::dataset::Transaction;
use basketry_core::errors::MiningError;
use tracing::info;

use crate::commands::CommandResult;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_DATASET: u8 = 3;
pub const EXIT_MINING: u8 = 4;

pub fn load_config(command: &str, overrides: ConfigOverrides) -> Result<AppConfig, CommandResult> {
    let config = AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }).map_err(
        |error| {
            CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            )
        },
    )?;
    crate::init_logging(&config.logging);
    Ok(config)
}

pub fn load_transactions(
    command: &str,
    config: &AppConfig,
) -> Result<Vec<Transaction>, CommandResult> {
    let path = &config.dataset.path;
    let text = fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            command,
            "dataset_read",
            format!("could not read dataset `{}`: {error}", path.display()),
            EXIT_DATASET,
        )
    })?;

    let transactions = config.dataset.format.parse(&text).map_err(|error| {
        CommandResult::failure(
            command,
            "dataset_read",
            format!("could not parse dataset `{}`: {error}", path.display()),
            EXIT_DATASET,
        )
    })?;

    info!(
        event_name = "cli.dataset.loaded",
        path = %path.display(),
        transactions = transactions.len(),
        "dataset loaded"
    );
    Ok(transactions)
}

pub fn mining_failure(command: &str, error: MiningError) -> CommandResult {
    let error_class = match error {
        MiningError::InvalidParameter(_) => "invalid_parameter",
        MiningError::InvalidInput(_) => "invalid_input",
    };
    CommandResult::failure(command, error_class, error.to_string(), EXIT_MINING)
}
