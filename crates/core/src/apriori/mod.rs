//! Frequent itemset mining and association rule derivation.
//!
//! The pipeline is: transactions -> [`TransactionIndex`] ->
//! [`FrequentItemsetMiner`] (using [`candidates`]) -> [`FrequentItemsets`] ->
//! [`RuleGenerator`] -> rules.

pub mod candidates;
mod index;
mod itemsets;
pub mod metrics;
mod rules;

pub use index::{FloorCheck, TransactionIndex};
pub use itemsets::{
    mine_itemsets, try_mine_itemsets, FrequentItemsetMiner, FrequentItemsets, ItemsetCount,
    ItemsetSummary, MiningParams, DEFAULT_MAX_LENGTH,
};
pub use metrics::RuleMetrics;
pub use rules::{checked_transaction_count, generate_rules, Rule, RuleGenerator, RuleParams};

use tracing::info;

use crate::errors::MiningError;
use crate::itemset::Item;

/// Parameters for the combined mine-then-derive pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct AprioriParams {
    pub mining: MiningParams,
    pub min_confidence: f64,
}

impl Default for AprioriParams {
    fn default() -> Self {
        Self { mining: MiningParams::default(), min_confidence: 0.5 }
    }
}

impl AprioriParams {
    pub fn new(min_support: f64, min_confidence: f64) -> Self {
        Self { mining: MiningParams::new(min_support), min_confidence }
    }

    pub fn validate(&self) -> Result<(), MiningError> {
        self.mining.validate()?;
        RuleParams::new(self.min_confidence, 0).validate()
    }
}

#[derive(Clone, Debug)]
pub struct AprioriOutput<T: Item> {
    pub itemsets: FrequentItemsets<T>,
    pub rules: Vec<Rule<T>>,
}

/// Mines frequent itemsets and derives rules with the mined transaction count.
///
/// Both parameter sets are validated before any transaction is read.
pub fn apriori<T, I, Tx>(transactions: I, params: &AprioriParams) -> Result<AprioriOutput<T>, MiningError>
where
    T: Item + Send + Sync,
    I: IntoIterator<Item = Tx>,
    Tx: IntoIterator<Item = T>,
{
    params.validate()?;
    let itemsets = mine_itemsets(transactions, &params.mining)?;
    let rule_params = RuleParams::new(params.min_confidence, itemsets.transaction_count)
        .with_verbosity(params.mining.verbosity)
        .with_parallel(params.mining.parallel);
    let rules = generate_rules(&itemsets, &rule_params)?;

    info!(
        event_name = "mining.pipeline.completed",
        transactions = itemsets.transaction_count,
        itemsets = itemsets.len(),
        rules = rules.len(),
        "apriori pipeline completed"
    );

    Ok(AprioriOutput { itemsets, rules })
}

#[cfg(test)]
mod tests {
    use super::{apriori, AprioriParams};
    use crate::errors::MiningError;
    use crate::itemset::Itemset;

    #[test]
    fn pipeline_mines_and_derives() {
        let output = apriori(
            vec![vec!["milk", "bread"], vec!["milk", "bread", "butter"], vec!["beer", "bread"]],
            &AprioriParams::new(0.5, 1.0),
        )
        .expect("valid parameters");

        assert_eq!(output.itemsets.transaction_count, 3);
        assert_eq!(output.itemsets.len(), 3);
        assert_eq!(output.rules.len(), 1);
        assert_eq!(output.rules[0].consequent, Itemset::new(["bread"]));
    }

    #[test]
    fn bad_confidence_fails_before_mining() {
        let error = apriori(vec![vec!["a"]], &AprioriParams::new(0.5, 2.0))
            .expect_err("confidence outside [0, 1]");
        assert!(matches!(error, MiningError::InvalidParameter(ref message) if message.contains("min_confidence")));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let output = apriori(Vec::<Vec<&str>>::new(), &AprioriParams::default()).expect("valid");
        assert!(output.itemsets.is_empty());
        assert!(output.rules.is_empty());
    }
}
