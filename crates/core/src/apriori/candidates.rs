//! Level-wise candidate generation (join + prune).

use std::collections::HashSet;

use crate::itemset::{Item, Itemset};

/// Joins sorted length-k itemsets into length-(k+1) candidates.
///
/// Itemsets sharing the same prefix (everything but the last item) must be
/// contiguous, which holds for any sorted input. Each group of `n` siblings
/// yields `n * (n - 1) / 2` candidates.
pub fn join<T: Item>(sorted_itemsets: &[Itemset<T>]) -> Vec<Itemset<T>> {
    let mut candidates = Vec::new();
    let mut start = 0;

    while start < sorted_itemsets.len() {
        let prefix = sorted_itemsets[start].prefix();
        let group_len = sorted_itemsets[start..]
            .iter()
            .take_while(|itemset| itemset.prefix() == prefix)
            .count();

        let tails: Vec<&T> = sorted_itemsets[start..start + group_len]
            .iter()
            .filter_map(Itemset::last)
            .collect();

        for (position, first) in tails.iter().enumerate() {
            for second in &tails[position + 1..] {
                let mut items = Vec::with_capacity(prefix.len() + 2);
                items.extend_from_slice(prefix);
                items.push((*first).clone());
                items.push((*second).clone());
                candidates.push(Itemset::from_sorted(items));
            }
        }

        start += group_len;
    }

    candidates
}

/// Drops candidates with a length-k subset that is not in `frequent`.
///
/// Only the subsets formed by removing one of the first `len - 2` items are
/// checked; removing either of the last two items yields a join parent, which
/// is frequent by construction.
pub fn prune<T: Item>(frequent: &[Itemset<T>], candidates: Vec<Itemset<T>>) -> Vec<Itemset<T>> {
    let known: HashSet<&Itemset<T>> = frequent.iter().collect();

    candidates
        .into_iter()
        .filter(|candidate| {
            let checked = candidate.len().saturating_sub(2);
            (0..checked).all(|index| known.contains(&candidate.without_index(index)))
        })
        .collect()
}

/// Join followed by prune.
pub fn generate<T: Item>(sorted_itemsets: &[Itemset<T>]) -> Vec<Itemset<T>> {
    prune(sorted_itemsets, join(sorted_itemsets))
}
