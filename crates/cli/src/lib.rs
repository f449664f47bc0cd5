pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use basketry_core::config::{ConfigOverrides, LogFormat, LoggingConfig};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "basketry",
    about = "Basketry market basket analysis CLI",
    long_about = "Mine frequent itemsets and association rules from a transaction dataset and serve basket recommendations.",
    after_help = "Examples:\n  basketry mine --min-support 0.3\n  basketry rules --min-confidence 0.8\n  basketry recommend --basket milk,bread --count 3\n  basketry config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Minimum support fraction in [0, 1]")]
    min_support: Option<f64>,
    #[arg(long, global = true, help = "Minimum rule confidence in [0, 1]")]
    min_confidence: Option<f64>,
    #[arg(long, global = true, help = "Largest itemset length to mine")]
    max_length: Option<usize>,
    #[arg(long, global = true, help = "Path of the transaction dataset")]
    dataset: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Mine frequent itemsets and print them grouped by length")]
    Mine,
    #[command(about = "Mine itemsets, derive association rules and print them with metrics")]
    Rules,
    #[command(about = "Recommend items for a basket from the mined rules")]
    Recommend {
        #[arg(long, value_delimiter = ',', required = true, help = "Comma separated basket items")]
        basket: Vec<String>,
        #[arg(long, help = "Maximum number of recommendations (defaults to config)")]
        count: Option<usize>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            min_support: self.min_support,
            min_confidence: self.min_confidence,
            max_length: self.max_length,
            dataset_path: self.dataset.clone(),
            ..ConfigOverrides::default()
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let overrides = cli.overrides();

    let result = match cli.command {
        Command::Mine => commands::mine::run(overrides),
        Command::Rules => commands::rules::run(overrides),
        Command::Recommend { basket, count } => commands::recommend::run(overrides, basket, count),
        Command::Config => commands::config::run(overrides),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the global subscriber on stderr so stdout stays a single JSON payload.
///
/// Later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use basketry_core::config::{LogFormat, LoggingConfig};

    use super::init_logging;

    #[test]
    fn logging_init_tolerates_repeats_and_bad_levels() {
        for format in [LogFormat::Json, LogFormat::Compact, LogFormat::Pretty] {
            init_logging(&LoggingConfig { level: "not-a-level".to_string(), format });
        }
        tracing::info!(event_name = "cli.test.logged", "subscriber accepts events");
    }
}
