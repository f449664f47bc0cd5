//! Recommendation engine implementation

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::types::*;
use crate::apriori::Rule;
use crate::itemset::Item;

/// Strongest rule first; ties broken by canonical antecedent, then consequent.
fn rank<T: Item>(left: &Rule<T>, right: &Rule<T>) -> Ordering {
    let by_confidence = match (left.confidence(), right.confidence()) {
        (Some(left), Some(right)) => right.total_cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_confidence
        .then_with(|| left.antecedent.cmp(&right.antecedent))
        .then_with(|| left.consequent.cmp(&right.consequent))
}

/// Serves recommendations from a read-only, pre-ranked rule snapshot.
///
/// Cloning is cheap; clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct RecommendationEngine<T: Item> {
    ranked: Arc<[Rule<T>]>,
}

impl<T: Item> RecommendationEngine<T> {
    pub fn new(mut rules: Vec<Rule<T>>) -> Self {
        rules.sort_by(rank);
        Self { ranked: rules.into() }
    }

    pub fn rule_count(&self) -> usize {
        self.ranked.len()
    }

    /// Rules in ranking order.
    pub fn rules(&self) -> &[Rule<T>] {
        &self.ranked
    }

    /// Items to suggest for the request's basket, best first.
    pub fn recommend(&self, request: &RecommendationRequest<T>) -> Vec<T> {
        self.explain(request).into_iter().map(|recommendation| recommendation.item).collect()
    }

    /// Like [`Self::recommend`], keeping the rule behind each item.
    pub fn explain(&self, request: &RecommendationRequest<T>) -> Vec<Recommendation<T>> {
        let limit = request.max_recommendations;
        let mut recommendations: Vec<Recommendation<T>> = Vec::new();
        if limit == 0 {
            return recommendations;
        }

        let mut seen: HashSet<&T> = HashSet::new();
        let applicable = self.ranked.iter().filter(|rule| rule.antecedent.is_subset_of(&request.basket));

        'rules: for rule in applicable {
            for item in rule.consequent.items() {
                if request.basket.contains(item) || !seen.insert(item) {
                    continue;
                }
                recommendations.push(Recommendation {
                    item: item.clone(),
                    confidence: rule.confidence(),
                    lift: rule.lift(),
                    because_of: rule.antecedent.clone(),
                });
                if recommendations.len() >= limit {
                    break 'rules;
                }
            }
        }

        debug!(
            event_name = "recommend.basket.served",
            basket_size = request.basket.len(),
            requested = limit,
            returned = recommendations.len(),
            "recommendations computed"
        );
        recommendations
    }
}

impl<T: Item> Default for RecommendationEngine<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// One-shot recommendation over an unranked rule slice.
pub fn recommend<T: Item>(
    basket: &BTreeSet<T>,
    rules: &[Rule<T>],
    num_recommendations: usize,
) -> Vec<T> {
    let engine = RecommendationEngine::new(rules.to_vec());
    let request = RecommendationRequest {
        basket: basket.clone(),
        max_recommendations: num_recommendations,
    };
    engine.recommend(&request)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;
    use crate::apriori::{apriori, AprioriParams};
    use crate::itemset::Itemset;

    fn rule(antecedent: &[&'static str], consequent: &[&'static str], full: usize, lhs: usize) -> Rule<&'static str> {
        Rule {
            antecedent: Itemset::new(antecedent.iter().copied()),
            consequent: Itemset::new(consequent.iter().copied()),
            count_full: full,
            count_antecedent: lhs,
            count_consequent: full,
            num_transactions: 10,
        }
    }

    fn basket(items: &[&'static str]) -> BTreeSet<&'static str> {
        items.iter().copied().collect()
    }

    #[test]
    fn milk_basket_gets_bread() {
        let rules = vec![rule(&["milk"], &["bread"], 2, 2)];
        assert_eq!(recommend(&basket(&["milk"]), &rules, 5), vec!["bread"]);
    }

    #[test]
    fn rules_with_unmet_antecedents_are_ignored() {
        let rules = vec![rule(&["milk", "eggs"], &["flour"], 4, 4)];
        assert!(recommend(&basket(&["milk"]), &rules, 5).is_empty());
    }

    #[test]
    fn higher_confidence_comes_first() {
        let rules = vec![
            rule(&["milk"], &["cookies"], 5, 10),
            rule(&["milk"], &["bread"], 9, 10),
            rule(&["milk"], &["cereal"], 7, 10),
        ];
        assert_eq!(recommend(&basket(&["milk"]), &rules, 5), vec!["bread", "cereal", "cookies"]);
    }

    #[test]
    fn ties_break_on_canonical_order() {
        let rules = vec![
            rule(&["milk"], &["zucchini"], 5, 10),
            rule(&["bread"], &["yogurt"], 5, 10),
            rule(&["bread"], &["apples"], 5, 10),
        ];
        assert_eq!(
            recommend(&basket(&["milk", "bread"]), &rules, 2),
            vec!["apples", "yogurt"]
        );
    }

    #[test]
    fn basket_items_and_duplicates_are_skipped() {
        let rules = vec![
            rule(&["milk"], &["bread", "milk"], 9, 10),
            rule(&["milk"], &["bread"], 8, 10),
            rule(&["milk"], &["jam"], 7, 10),
        ];
        assert_eq!(recommend(&basket(&["milk"]), &rules, 5), vec!["bread", "jam"]);
    }

    #[test]
    fn count_limits_output() {
        let rules = vec![rule(&["milk"], &["bread", "butter", "jam"], 9, 10)];
        assert_eq!(recommend(&basket(&["milk"]), &rules, 2), vec!["bread", "butter"]);
        assert!(recommend(&basket(&["milk"]), &rules, 0).is_empty());
    }

    #[test]
    fn explain_reports_the_contributing_rule() {
        let engine = RecommendationEngine::new(vec![rule(&["milk"], &["bread"], 2, 2)]);
        let explained = engine.explain(&RecommendationRequest::new(["milk"]));

        assert_eq!(explained.len(), 1);
        assert_eq!(explained[0].item, "bread");
        assert_eq!(explained[0].confidence, Some(1.0));
        assert_eq!(explained[0].because_of, Itemset::new(["milk"]));
    }

    #[test]
    fn engine_end_to_end_from_transactions() {
        let output = apriori(
            vec![vec!["milk", "bread"], vec!["milk", "bread", "butter"], vec!["beer", "bread"]],
            &AprioriParams::new(0.5, 1.0),
        )
        .expect("valid parameters");
        let engine = RecommendationEngine::new(output.rules);

        let request = RecommendationRequest::new(["milk"]).with_max_recommendations(5);
        assert_eq!(engine.recommend(&request), vec!["bread"]);
        assert!(engine.recommend(&RecommendationRequest::new(["bread"])).is_empty());
    }

    fn rules_strategy() -> impl Strategy<Value = Vec<Rule<u8>>> {
        prop::collection::vec(
            (
                prop::collection::btree_set(0u8..8, 1..3),
                prop::collection::btree_set(0u8..8, 1..3),
                1usize..10,
            ),
            0..15,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .map(|(antecedent, consequent, full)| Rule {
                    antecedent: Itemset::new(antecedent),
                    consequent: Itemset::new(consequent),
                    count_full: full,
                    count_antecedent: 10,
                    count_consequent: full,
                    num_transactions: 20,
                })
                .collect()
        })
    }

    proptest! {
        /// Property: recommendations never repeat and never echo the basket.
        #[test]
        fn output_is_disjoint_from_basket(
            rules in rules_strategy(),
            basket in prop::collection::btree_set(0u8..8, 0..5),
            count in 0usize..6,
        ) {
            let output = recommend(&basket, &rules, count);

            prop_assert!(output.len() <= count);
            let unique: BTreeSet<_> = output.iter().collect();
            prop_assert_eq!(unique.len(), output.len());
            for item in &output {
                prop_assert!(!basket.contains(item));
            }
        }

        /// Property: rule order in the input does not change the output.
        #[test]
        fn output_ignores_rule_order(
            rules in rules_strategy(),
            basket in prop::collection::btree_set(0u8..8, 0..5),
        ) {
            let forward = recommend(&basket, &rules, 3);
            let mut reversed = rules;
            reversed.reverse();
            prop_assert_eq!(forward, recommend(&basket, &reversed, 3));
        }
    }
}
