use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::candidates;
use super::itemsets::FrequentItemsets;
use super::metrics::{self, RuleMetrics};
use crate::errors::MiningError;
use crate::itemset::{Item, Itemset};

/// An association rule `antecedent -> consequent` with the counts it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rule<T> {
    pub antecedent: Itemset<T>,
    pub consequent: Itemset<T>,
    pub count_full: usize,
    pub count_antecedent: usize,
    pub count_consequent: usize,
    pub num_transactions: usize,
}

impl<T: Item> Rule<T> {
    pub fn confidence(&self) -> Option<f64> {
        metrics::confidence(self.count_full, self.count_antecedent)
    }

    pub fn support(&self) -> Option<f64> {
        metrics::support(self.count_full, self.num_transactions)
    }

    pub fn lift(&self) -> Option<f64> {
        metrics::lift(
            self.count_full,
            self.count_antecedent,
            self.count_consequent,
            self.num_transactions,
        )
    }

    pub fn conviction(&self) -> Option<f64> {
        metrics::conviction(
            self.count_full,
            self.count_antecedent,
            self.count_consequent,
            self.num_transactions,
        )
    }

    pub fn rpf(&self) -> Option<f64> {
        metrics::rpf(self.count_full, self.count_antecedent, self.num_transactions)
    }

    pub fn metrics(&self) -> RuleMetrics {
        RuleMetrics::from_counts(
            self.count_full,
            self.count_antecedent,
            self.count_consequent,
            self.num_transactions,
        )
    }

    /// The frequent itemset this rule was derived from.
    pub fn itemset(&self) -> Itemset<T> {
        self.antecedent.union(&self.consequent)
    }

    pub fn len(&self) -> usize {
        self.antecedent.len() + self.consequent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Item + fmt::Display> fmt::Display for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.antecedent, self.consequent)?;
        let metrics = self.metrics();
        let fields = [
            ("conf", metrics.confidence),
            ("supp", metrics.support),
            ("lift", metrics.lift),
            ("conv", metrics.conviction),
        ];
        f.write_str(" (")?;
        for (position, (label, value)) in fields.into_iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            match value {
                Some(value) => write!(f, "{label}: {value:.3}")?,
                None => write!(f, "{label}: n/a")?,
            }
        }
        f.write_str(")")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleParams {
    pub min_confidence: f64,
    pub num_transactions: usize,
    pub verbosity: u8,
    pub parallel: bool,
}

impl RuleParams {
    pub fn new(min_confidence: f64, num_transactions: usize) -> Self {
        Self { min_confidence, num_transactions, verbosity: 0, parallel: false }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), MiningError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(MiningError::invalid_parameter(format!(
                "min_confidence must be a number between 0 and 1 (got {})",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

/// Converts a signed transaction count from an outer layer.
pub fn checked_transaction_count(value: i64) -> Result<usize, MiningError> {
    usize::try_from(value).map_err(|_| {
        MiningError::invalid_parameter(format!(
            "num_transactions must be a non-negative number (got {value})"
        ))
    })
}

/// Derives confidence-qualified rules from frequent itemsets.
#[derive(Clone, Debug)]
pub struct RuleGenerator<'a, T: Item> {
    itemsets: &'a FrequentItemsets<T>,
    params: RuleParams,
}

impl<'a, T> RuleGenerator<'a, T>
where
    T: Item + Send + Sync,
{
    pub fn new(itemsets: &'a FrequentItemsets<T>, params: RuleParams) -> Result<Self, MiningError> {
        params.validate()?;
        Ok(Self { itemsets, params })
    }

    pub fn generate(&self) -> Result<Vec<Rule<T>>, MiningError> {
        if self.params.verbosity > 0 {
            info!(event_name = "mining.rules.start", "generating rules from itemsets");
        }

        let mut rules = Vec::new();
        for (&size, level) in &self.itemsets.by_length {
            if size < 2 {
                continue;
            }
            if self.params.verbosity > 0 {
                info!(
                    event_name = "mining.rules.level",
                    size,
                    itemsets = level.len(),
                    "generating rules of size {size}"
                );
            }

            let itemsets: Vec<&Itemset<T>> = level.keys().collect();
            let per_itemset: Vec<Result<Vec<Rule<T>>, MiningError>> = if self.params.parallel {
                itemsets.into_par_iter().map(|itemset| self.rules_for(itemset)).collect()
            } else {
                itemsets.into_iter().map(|itemset| self.rules_for(itemset)).collect()
            };

            for batch in per_itemset {
                rules.extend(batch?);
            }
        }

        debug!(
            event_name = "mining.rules.generated",
            rules = rules.len(),
            min_confidence = self.params.min_confidence,
            "rule generation terminated"
        );
        Ok(rules)
    }

    /// All qualifying rules for one itemset of size >= 2.
    ///
    /// Single-item consequents seed the search; qualifying consequents are then
    /// grown one item at a time with the candidate join, discarding any whose
    /// confidence falls below the floor. Confidence can only drop as the
    /// consequent grows, so a failed consequent is never extended.
    fn rules_for(&self, itemset: &Itemset<T>) -> Result<Vec<Rule<T>>, MiningError> {
        let count_full = self.count_of(itemset)?;
        let mut rules = Vec::new();

        let seeds: Vec<Itemset<T>> =
            itemset.items().iter().cloned().map(Itemset::single).collect();
        let mut growth = self.qualifying(itemset, count_full, seeds, &mut rules)?;

        while let Some(first) = growth.first() {
            if itemset.len() <= first.len() + 1 {
                break;
            }
            growth.sort();
            let candidates = candidates::generate(&growth);
            if candidates.is_empty() {
                break;
            }
            growth = self.qualifying(itemset, count_full, candidates, &mut rules)?;
        }

        Ok(rules)
    }

    /// Emits a rule for every consequent meeting the floor and returns those consequents.
    fn qualifying(
        &self,
        itemset: &Itemset<T>,
        count_full: usize,
        consequents: Vec<Itemset<T>>,
        rules: &mut Vec<Rule<T>>,
    ) -> Result<Vec<Itemset<T>>, MiningError> {
        let mut kept = Vec::with_capacity(consequents.len());
        for consequent in consequents {
            let antecedent = itemset.difference(&consequent);
            let count_antecedent = self.count_of(&antecedent)?;
            let passes = metrics::confidence(count_full, count_antecedent)
                .is_some_and(|confidence| confidence >= self.params.min_confidence);
            if !passes {
                continue;
            }

            let count_consequent = self.count_of(&consequent)?;
            rules.push(Rule {
                antecedent,
                consequent: consequent.clone(),
                count_full,
                count_antecedent,
                count_consequent,
                num_transactions: self.params.num_transactions,
            });
            kept.push(consequent);
        }
        Ok(kept)
    }

    fn count_of(&self, itemset: &Itemset<T>) -> Result<usize, MiningError> {
        self.itemsets.count(itemset).ok_or_else(|| {
            MiningError::invalid_input(format!(
                "itemset {itemset:?} has no recorded count; itemsets must be downward closed"
            ))
        })
    }
}

/// Generates every rule meeting `params.min_confidence`.
pub fn generate_rules<T>(
    itemsets: &FrequentItemsets<T>,
    params: &RuleParams,
) -> Result<Vec<Rule<T>>, MiningError>
where
    T: Item + Send + Sync,
{
    RuleGenerator::new(itemsets, params.clone())?.generate()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use proptest::prelude::*;

    use super::{checked_transaction_count, generate_rules, Rule, RuleParams};
    use crate::apriori::metrics::confidence;
    use crate::apriori::itemsets::{mine_itemsets, FrequentItemsets, ItemsetCount, MiningParams};
    use crate::errors::MiningError;
    use crate::itemset::Itemset;

    fn groceries() -> FrequentItemsets<&'static str> {
        mine_itemsets(
            vec![vec!["milk", "bread"], vec!["milk", "bread", "butter"], vec!["beer", "bread"]],
            &MiningParams::new(0.5),
        )
        .expect("valid parameters")
    }

    fn rules(itemsets: &FrequentItemsets<&'static str>, min_confidence: f64) -> Vec<Rule<&'static str>> {
        generate_rules(itemsets, &RuleParams::new(min_confidence, itemsets.transaction_count))
            .expect("valid parameters")
    }

    #[test]
    fn certain_rule_only_at_full_confidence() {
        let rules = rules(&groceries(), 1.0);

        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.antecedent, Itemset::new(["milk"]));
        assert_eq!(rule.consequent, Itemset::new(["bread"]));
        assert_eq!((rule.count_full, rule.count_antecedent, rule.count_consequent), (2, 2, 3));
        assert_eq!(rule.num_transactions, 3);
        assert_eq!(rule.confidence(), Some(1.0));
    }

    #[test]
    fn lower_floor_admits_both_directions() {
        let rules = rules(&groceries(), 0.5);
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().any(|rule| rule.antecedent == Itemset::new(["bread"])));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let itemsets = groceries();
        for min_confidence in [1.01, -0.5, f64::NAN] {
            let error = generate_rules(&itemsets, &RuleParams::new(min_confidence, 3))
                .expect_err("confidence outside [0, 1]");
            assert!(matches!(error, MiningError::InvalidParameter(_)));
        }
    }

    #[test]
    fn negative_transaction_counts_are_rejected() {
        assert_eq!(checked_transaction_count(3), Ok(3));
        assert!(matches!(checked_transaction_count(-1), Err(MiningError::InvalidParameter(_))));
    }

    #[test]
    fn no_itemsets_means_no_rules() {
        let empty = FrequentItemsets::<&str>::empty(0);
        assert!(rules(&empty, 0.0).is_empty());
    }

    #[test]
    fn consequents_grow_beyond_one_item() {
        let transactions = vec![vec!["a", "b", "c"]; 3];
        let itemsets = mine_itemsets(transactions, &MiningParams::new(0.5)).expect("valid");
        let rules = rules(&itemsets, 1.0);

        // {a,b,c}: 3 single-item and 3 two-item consequents; each pair: 2 rules.
        assert_eq!(rules.len(), 12);
        assert!(rules.iter().any(|rule| {
            rule.antecedent == Itemset::new(["a"]) && rule.consequent == Itemset::new(["b", "c"])
        }));
    }

    #[test]
    fn weak_directions_are_dropped() {
        // c appears alone often, so {c} -> {a} is weak while {a} -> {c} holds.
        let transactions = vec![
            vec!["a", "b", "c"],
            vec!["a", "b", "c"],
            vec!["c"],
            vec!["c"],
            vec!["b"],
        ];
        let itemsets = mine_itemsets(transactions, &MiningParams::new(0.4)).expect("valid");
        let rules = rules(&itemsets, 0.9);

        for rule in &rules {
            assert!(rule.confidence().is_some_and(|confidence| confidence >= 0.9));
        }
        assert!(rules.iter().any(|rule| {
            rule.antecedent == Itemset::new(["a"]) && rule.consequent == Itemset::new(["b", "c"])
        }));
        assert!(!rules.iter().any(|rule| rule.antecedent == Itemset::new(["c"])));
    }

    #[test]
    fn failed_consequent_blocks_its_supersets() {
        // {a,b} -> {c,d} holds for half the baskets, so {c,d} is never grown.
        let transactions = vec![
            vec!["a", "b", "c", "d"],
            vec!["a", "b", "c", "d"],
            vec!["a", "b"],
            vec!["a", "b"],
        ];
        let itemsets = mine_itemsets(transactions, &MiningParams::new(0.5)).expect("valid");
        let rules = rules(&itemsets, 0.9);

        let has_rule = |antecedent: &[&'static str], consequent: &[&'static str]| {
            rules.iter().any(|rule| {
                rule.antecedent == Itemset::new(antecedent.iter().copied())
                    && rule.consequent == Itemset::new(consequent.iter().copied())
            })
        };
        assert!(has_rule(&["d"], &["a", "b", "c"]));
        assert!(has_rule(&["c"], &["a", "b", "d"]));
        assert!(has_rule(&["c", "d"], &["a", "b"]));

        let blocked_consequents: [&[&str]; 3] = [&["c", "d"], &["a", "c", "d"], &["b", "c", "d"]];
        for blocked in blocked_consequents {
            let blocked = Itemset::new(blocked.iter().copied());
            assert!(
                !rules.iter().any(|rule| rule.consequent == blocked),
                "{blocked:?} should not appear as a consequent"
            );
        }
    }

    #[test]
    fn missing_subset_count_is_invalid_input() {
        let mut level = BTreeMap::new();
        level.insert(Itemset::new(["a", "b"]), ItemsetCount::new(1));
        let mut by_length = BTreeMap::new();
        by_length.insert(2, level);
        let itemsets = FrequentItemsets { by_length, transaction_count: 1 };

        let error = generate_rules(&itemsets, &RuleParams::new(0.5, 1)).expect_err("not closed");
        assert!(matches!(error, MiningError::InvalidInput(_)));
    }

    #[test]
    fn parallel_generation_matches_sequential() {
        let itemsets = mine_itemsets(
            vec![vec!["a", "b", "c"], vec!["a", "b"], vec!["b", "c", "d"], vec!["a", "c", "d"]],
            &MiningParams::new(0.25),
        )
        .expect("valid");
        let params = RuleParams::new(0.3, itemsets.transaction_count);

        let sequential = generate_rules(&itemsets, &params).expect("valid");
        let parallel = generate_rules(&itemsets, &params.clone().with_parallel(true)).expect("valid");
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn display_includes_rounded_metrics() {
        let rules = rules(&groceries(), 1.0);
        assert_eq!(
            rules[0].to_string(),
            "{milk} -> {bread} (conf: 1.000, supp: 0.667, lift: 1.000, conv: 0.000)"
        );
    }

    fn transactions_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
        prop::collection::vec(prop::collection::vec(0u8..5, 1..5), 1..10)
    }

    proptest! {
        /// Property: no emitted rule falls below the confidence floor and every
        /// rule partitions a frequent itemset.
        #[test]
        fn rules_respect_floor_and_partition(
            transactions in transactions_strategy(),
            min_support in 0.1f64..0.8,
            min_confidence in 0.0f64..=1.0,
        ) {
            let itemsets = mine_itemsets(transactions, &MiningParams::new(min_support))
                .expect("valid");
            let rules = generate_rules(
                &itemsets,
                &RuleParams::new(min_confidence, itemsets.transaction_count),
            )
            .expect("valid");

            for rule in rules {
                let confidence = rule.confidence().expect("antecedent count is positive");
                prop_assert!(confidence + 1e-12 >= min_confidence);
                prop_assert!(rule.antecedent.is_disjoint(&rule.consequent));
                prop_assert!(!rule.antecedent.is_empty());
                prop_assert!(!rule.consequent.is_empty());
                prop_assert_eq!(itemsets.count(&rule.itemset()), Some(rule.count_full));
            }
        }

        /// Property: the generated rules are exactly the qualifying splits
        /// found by enumerating every consequent of every frequent itemset.
        #[test]
        fn rules_match_exhaustive_enumeration(
            transactions in transactions_strategy(),
            min_support in 0.1f64..0.8,
            min_confidence in 0.0f64..=1.0,
        ) {
            let itemsets = mine_itemsets(transactions, &MiningParams::new(min_support))
                .expect("valid");
            let rules = generate_rules(
                &itemsets,
                &RuleParams::new(min_confidence, itemsets.transaction_count),
            )
            .expect("valid");

            let mut expected = BTreeSet::new();
            for (itemset, entry) in itemsets.iter().filter(|(itemset, _)| itemset.len() >= 2) {
                let items = itemset.items();
                for mask in 1..(1u32 << items.len()) - 1 {
                    let consequent = Itemset::new(
                        items
                            .iter()
                            .enumerate()
                            .filter(|(position, _)| mask & (1 << position) != 0)
                            .map(|(_, item)| *item),
                    );
                    let antecedent = itemset.difference(&consequent);
                    let count_antecedent =
                        itemsets.count(&antecedent).expect("subsets of frequent itemsets are frequent");
                    if confidence(entry.count, count_antecedent)
                        .is_some_and(|value| value >= min_confidence)
                    {
                        expected.insert((antecedent, consequent));
                    }
                }
            }

            let generated: BTreeSet<_> = rules
                .iter()
                .map(|rule| (rule.antecedent.clone(), rule.consequent.clone()))
                .collect();
            prop_assert_eq!(generated.len(), rules.len(), "duplicate rules");
            prop_assert_eq!(generated, expected);
        }
    }
}
