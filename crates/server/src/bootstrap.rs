use std::path::PathBuf;

use basketry_core::apriori::apriori;
use basketry_core::config::{AppConfig, ConfigError};
use basketry_core::dataset::Transaction;
use basketry_core::errors::MiningError;
use basketry_core::recommend::RecommendationEngine;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

/// Read-only snapshot shared by every request handler.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub engine: RecommendationEngine<String>,
    pub itemsets: usize,
    pub transactions: usize,
    pub max_recommendations: usize,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not read dataset `{path}`: {source}")]
    DatasetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse dataset `{path}`: {source}")]
    DatasetParse {
        path: PathBuf,
        #[source]
        source: MiningError,
    },
    #[error("rule mining failed: {0}")]
    Mining(#[source] MiningError),
    #[error("rule mining task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        dataset = %config.dataset.path.display(),
        "starting application bootstrap"
    );

    let path = config.dataset.path.clone();
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| BootstrapError::DatasetRead { path: path.clone(), source })?;
    let transactions = config
        .dataset
        .format
        .parse(&text)
        .map_err(|source| BootstrapError::DatasetParse { path, source })?;
    info!(
        event_name = "system.bootstrap.dataset_loaded",
        correlation_id = "bootstrap",
        transactions = transactions.len(),
        "dataset loaded"
    );

    let pipeline_config = config.clone();
    let state = tokio::task::spawn_blocking(move || build_state(&pipeline_config, transactions))
        .await?
        .map_err(BootstrapError::Mining)?;
    info!(
        event_name = "system.bootstrap.rules_ready",
        correlation_id = "bootstrap",
        itemsets = state.itemsets,
        rules = state.engine.rule_count(),
        "rule snapshot ready"
    );

    Ok(Application { config, state })
}

pub fn build_state(
    config: &AppConfig,
    transactions: Vec<Transaction>,
) -> Result<AppState, MiningError> {
    let output = apriori(transactions, &config.apriori_params())?;

    Ok(AppState {
        itemsets: output.itemsets.len(),
        transactions: output.itemsets.transaction_count,
        engine: RecommendationEngine::new(output.rules),
        max_recommendations: config.recommend.max_recommendations,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use basketry_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use tempfile::TempDir;

    use super::{bootstrap_with_config, build_state, Application, BootstrapError};

    fn groceries() -> Vec<Vec<String>> {
        [vec!["milk", "bread"], vec!["milk", "bread", "butter"], vec!["beer", "bread"]]
            .into_iter()
            .map(|basket| basket.into_iter().map(str::to_owned).collect())
            .collect()
    }

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        let config = AppConfig::load(options)?;
        bootstrap_with_config(config).await
    }

    #[test]
    fn state_counts_the_snapshot() {
        let mut config = AppConfig::default();
        config.mining.min_confidence = 1.0;

        let state = build_state(&config, groceries()).expect("valid config");

        assert_eq!(state.transactions, 3);
        assert_eq!(state.itemsets, 3);
        assert_eq!(state.engine.rule_count(), 1);
        assert_eq!(state.max_recommendations, 5);
    }

    #[tokio::test]
    async fn bootstrap_mines_the_configured_dataset() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("transactions.csv");
        fs::write(&path, "milk,bread\nmilk,bread,butter\nbeer,bread\n").expect("write dataset");

        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                dataset_path: Some(path),
                min_confidence: Some(1.0),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed");

        assert_eq!(app.state.engine.rule_count(), 1);
    }

    #[tokio::test]
    async fn bootstrap_reports_missing_dataset() {
        let dir = TempDir::new().expect("temp dir");
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                dataset_path: Some(dir.path().join("absent.csv")),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(matches!(result, Err(BootstrapError::DatasetRead { .. })));
    }
}
