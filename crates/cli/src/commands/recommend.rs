use std::collections::BTreeSet;

use basketry_core::apriori::apriori;
use basketry_core::config::ConfigOverrides;
use basketry_core::recommend::{Recommendation, RecommendationEngine, RecommendationRequest};
use serde::Serialize;

use crate::commands::dataset::{load_config, load_transactions, mining_failure, EXIT_MINING};
use crate::commands::{to_data, CommandResult};

const COMMAND: &str = "recommend";

#[derive(Debug, Serialize)]
struct RecommendOutput {
    basket: BTreeSet<String>,
    recommendations: Vec<Recommendation<String>>,
}

pub fn run(overrides: ConfigOverrides, basket: Vec<String>, count: Option<usize>) -> CommandResult {
    execute(overrides, basket, count).unwrap_or_else(|failure| failure)
}

fn execute(
    overrides: ConfigOverrides,
    basket: Vec<String>,
    count: Option<usize>,
) -> Result<CommandResult, CommandResult> {
    let basket: BTreeSet<String> = basket
        .into_iter()
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect();
    if basket.is_empty() {
        return Err(CommandResult::failure(
            COMMAND,
            "invalid_input",
            "basket must contain at least one item",
            EXIT_MINING,
        ));
    }

    let config = load_config(COMMAND, overrides)?;
    let transactions = load_transactions(COMMAND, &config)?;

    let output = apriori(transactions, &config.apriori_params())
        .map_err(|error| mining_failure(COMMAND, error))?;
    let engine = RecommendationEngine::new(output.rules);

    let request = RecommendationRequest::new(basket.iter().cloned())
        .with_max_recommendations(count.unwrap_or(config.recommend.max_recommendations));
    let recommendations = engine.explain(&request);

    let message = format!(
        "{} recommendation(s) for a basket of {} item(s)",
        recommendations.len(),
        basket.len()
    );
    let data = to_data(COMMAND, &RecommendOutput { basket, recommendations })?;
    Ok(CommandResult::success_with_data(COMMAND, message, Some(data)))
}
