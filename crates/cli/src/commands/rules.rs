use basketry_core::apriori::{apriori, Rule, RuleMetrics};
use basketry_core::config::ConfigOverrides;
use serde::Serialize;

use crate::commands::dataset::{load_config, load_transactions, mining_failure};
use crate::commands::{to_data, CommandResult};

const COMMAND: &str = "rules";

#[derive(Debug, Serialize)]
struct RuleRow<'a> {
    #[serde(flatten)]
    rule: &'a Rule<String>,
    #[serde(flatten)]
    metrics: RuleMetrics,
    summary: String,
}

#[derive(Debug, Serialize)]
struct RulesOutput<'a> {
    transactions: usize,
    itemsets: usize,
    rules: Vec<RuleRow<'a>>,
}

pub fn run(overrides: ConfigOverrides) -> CommandResult {
    execute(overrides).unwrap_or_else(|failure| failure)
}

fn execute(overrides: ConfigOverrides) -> Result<CommandResult, CommandResult> {
    let config = load_config(COMMAND, overrides)?;
    let transactions = load_transactions(COMMAND, &config)?;

    let output = apriori(transactions, &config.apriori_params())
        .map_err(|error| mining_failure(COMMAND, error))?;

    let rows = output
        .rules
        .iter()
        .map(|rule| RuleRow { rule, metrics: rule.metrics(), summary: rule.to_string() })
        .collect();

    let message = format!(
        "{} rule(s) from {} frequent itemset(s)",
        output.rules.len(),
        output.itemsets.len()
    );
    let data = to_data(
        COMMAND,
        &RulesOutput {
            transactions: output.itemsets.transaction_count,
            itemsets: output.itemsets.len(),
            rules: rows,
        },
    )?;
    Ok(CommandResult::success_with_data(COMMAND, message, Some(data)))
}
