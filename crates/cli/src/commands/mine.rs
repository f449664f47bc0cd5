use std::collections::BTreeMap;

use basketry_core::apriori::{mine_itemsets, ItemsetSummary};
use basketry_core::config::ConfigOverrides;
use serde::Serialize;

use crate::commands::dataset::{load_config, load_transactions, mining_failure};
use crate::commands::{to_data, CommandResult};

const COMMAND: &str = "mine";

#[derive(Debug, Serialize)]
struct MineOutput {
    transactions: usize,
    levels: BTreeMap<usize, Vec<ItemsetSummary<String>>>,
}

pub fn run(overrides: ConfigOverrides) -> CommandResult {
    execute(overrides).unwrap_or_else(|failure| failure)
}

fn execute(overrides: ConfigOverrides) -> Result<CommandResult, CommandResult> {
    let config = load_config(COMMAND, overrides)?;
    let transactions = load_transactions(COMMAND, &config)?;

    let itemsets = mine_itemsets(transactions, &config.mining_params())
        .map_err(|error| mining_failure(COMMAND, error))?;

    let mut levels: BTreeMap<usize, Vec<ItemsetSummary<String>>> = BTreeMap::new();
    for summary in itemsets.summaries() {
        levels.entry(summary.itemset.len()).or_default().push(summary);
    }

    let message = format!(
        "{} frequent itemset(s) across {} transaction(s)",
        itemsets.len(),
        itemsets.transaction_count
    );
    let data =
        to_data(COMMAND, &MineOutput { transactions: itemsets.transaction_count, levels })?;
    Ok(CommandResult::success_with_data(COMMAND, message, Some(data)))
}
