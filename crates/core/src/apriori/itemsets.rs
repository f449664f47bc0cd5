use std::collections::{BTreeMap, BTreeSet, HashSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::candidates;
use super::index::{FloorCheck, TransactionIndex};
use crate::errors::MiningError;
use crate::itemset::{Item, Itemset};

pub const DEFAULT_MAX_LENGTH: usize = 8;

/// Support count of a frequent itemset, optionally with the covering ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemsetCount {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_ids: Option<BTreeSet<usize>>,
}

impl ItemsetCount {
    pub fn new(count: usize) -> Self {
        Self { count, transaction_ids: None }
    }
}

/// Flat, serializable view of one frequent itemset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemsetSummary<T> {
    pub itemset: Itemset<T>,
    pub count: usize,
    pub support: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_ids: Option<BTreeSet<usize>>,
}

/// Frequent itemsets grouped by length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequentItemsets<T: Item> {
    pub by_length: BTreeMap<usize, BTreeMap<Itemset<T>, ItemsetCount>>,
    pub transaction_count: usize,
}

impl<T: Item> FrequentItemsets<T> {
    pub fn empty(transaction_count: usize) -> Self {
        Self { by_length: BTreeMap::new(), transaction_count }
    }

    pub fn is_empty(&self) -> bool {
        self.by_length.values().all(BTreeMap::is_empty)
    }

    /// Total number of frequent itemsets across all lengths.
    pub fn len(&self) -> usize {
        self.by_length.values().map(BTreeMap::len).sum()
    }

    pub fn max_length(&self) -> usize {
        self.by_length.keys().next_back().copied().unwrap_or(0)
    }

    pub fn get(&self, itemset: &Itemset<T>) -> Option<&ItemsetCount> {
        self.by_length.get(&itemset.len()).and_then(|level| level.get(itemset))
    }

    pub fn count(&self, itemset: &Itemset<T>) -> Option<usize> {
        self.get(itemset).map(|entry| entry.count)
    }

    pub fn level(&self, length: usize) -> Option<&BTreeMap<Itemset<T>, ItemsetCount>> {
        self.by_length.get(&length)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Itemset<T>, &ItemsetCount)> {
        self.by_length.values().flat_map(BTreeMap::iter)
    }

    /// Summaries in length-then-canonical order.
    pub fn summaries(&self) -> Vec<ItemsetSummary<T>> {
        let total = self.transaction_count.max(1) as f64;
        self.iter()
            .map(|(itemset, entry)| ItemsetSummary {
                itemset: itemset.clone(),
                count: entry.count,
                support: entry.count as f64 / total,
                transaction_ids: entry.transaction_ids.clone(),
            })
            .collect()
    }

    /// Plain counts keyed by itemset, dropping any transaction ids.
    pub fn counts(&self) -> BTreeMap<Itemset<T>, usize> {
        self.iter().map(|(itemset, entry)| (itemset.clone(), entry.count)).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MiningParams {
    pub min_support: f64,
    pub max_length: usize,
    /// 0 = silent, 1 = per-level summaries, 2 = itemized candidates.
    pub verbosity: u8,
    pub output_transaction_ids: bool,
    pub parallel: bool,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_support: 0.5,
            max_length: DEFAULT_MAX_LENGTH,
            verbosity: 0,
            output_transaction_ids: false,
            parallel: false,
        }
    }
}

impl MiningParams {
    pub fn new(min_support: f64) -> Self {
        Self { min_support, ..Self::default() }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_transaction_ids(mut self, enabled: bool) -> Self {
        self.output_transaction_ids = enabled;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), MiningError> {
        if !(0.0..=1.0).contains(&self.min_support) {
            return Err(MiningError::invalid_parameter(format!(
                "min_support must be a number between 0 and 1 (got {})",
                self.min_support
            )));
        }
        if self.max_length == 0 {
            return Err(MiningError::invalid_parameter("max_length must be at least 1"));
        }
        Ok(())
    }
}

/// Level-wise frequent itemset search over a prebuilt index.
#[derive(Clone, Debug)]
pub struct FrequentItemsetMiner {
    params: MiningParams,
}

impl FrequentItemsetMiner {
    pub fn new(params: MiningParams) -> Result<Self, MiningError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &MiningParams {
        &self.params
    }

    /// Runs the level-wise search over `index`.
    ///
    /// When no single item reaches the support floor the result is empty but
    /// still carries the real transaction count, so callers can tell "nothing
    /// frequent" apart from "no data". Only an empty index reports zero.
    pub fn mine<T>(&self, index: &TransactionIndex<T>) -> FrequentItemsets<T>
    where
        T: Item + Send + Sync,
    {
        let params = &self.params;
        let transaction_count = index.transaction_count();
        if transaction_count == 0 {
            debug!(event_name = "mining.itemsets.empty_input", "no transactions to mine");
            return FrequentItemsets::empty(0);
        }

        let mut by_length: BTreeMap<usize, BTreeMap<Itemset<T>, ItemsetCount>> = BTreeMap::new();

        let singles: BTreeMap<Itemset<T>, ItemsetCount> = index
            .items()
            .filter_map(|item| {
                let count = index.item_count(item);
                let support = count as f64 / transaction_count as f64;
                (support >= params.min_support)
                    .then(|| (Itemset::single(item.clone()), ItemsetCount::new(count)))
            })
            .collect();
        self.report_level(1, index.len(), &singles);

        if singles.is_empty() {
            return FrequentItemsets::empty(transaction_count);
        }
        by_length.insert(1, singles);

        let mut length = 1;
        while length < params.max_length {
            let Some(previous) = by_length.get(&length) else {
                break;
            };
            // BTreeMap keys are already in canonical order.
            let sorted: Vec<Itemset<T>> = previous.keys().cloned().collect();
            let candidates = candidates::generate(&sorted);
            let next_length = length + 1;

            if params.verbosity > 1 {
                debug!(
                    event_name = "mining.itemsets.candidates",
                    length = next_length,
                    candidates = ?candidates,
                    "candidate itemsets generated"
                );
            }
            if candidates.is_empty() {
                break;
            }

            let candidate_count = candidates.len();
            let survivors = self.count_candidates(index, candidates);
            self.report_level(next_length, candidate_count, &survivors);
            if survivors.is_empty() {
                break;
            }

            by_length.insert(next_length, survivors);
            length = next_length;
        }

        if params.output_transaction_ids {
            attach_transaction_ids(index, &mut by_length);
        }

        let result = FrequentItemsets { by_length, transaction_count };
        debug!(
            event_name = "mining.itemsets.finished",
            itemsets = result.len(),
            max_length = result.max_length(),
            transactions = transaction_count,
            "itemset generation terminated"
        );
        result
    }

    fn count_candidates<T>(
        &self,
        index: &TransactionIndex<T>,
        candidates: Vec<Itemset<T>>,
    ) -> BTreeMap<Itemset<T>, ItemsetCount>
    where
        T: Item + Send + Sync,
    {
        let min_support = self.params.min_support;
        let check = |candidate: Itemset<T>| match index
            .support_count_with_floor(&candidate, min_support)
        {
            FloorCheck::Frequent(ids) => Some((candidate, ItemsetCount::new(ids.len()))),
            FloorCheck::BelowFloor => None,
        };

        if self.params.parallel {
            candidates.into_par_iter().filter_map(check).collect::<Vec<_>>().into_iter().collect()
        } else {
            candidates.into_iter().filter_map(check).collect()
        }
    }

    fn report_level<T: Item>(
        &self,
        length: usize,
        candidate_count: usize,
        frequent: &BTreeMap<Itemset<T>, ItemsetCount>,
    ) {
        if self.params.verbosity > 0 {
            info!(
                event_name = "mining.itemsets.level_counted",
                length,
                candidates = candidate_count,
                frequent = frequent.len(),
                "counted itemsets of length {length}"
            );
        }
        if self.params.verbosity > 1 {
            debug!(
                event_name = "mining.itemsets.level_members",
                length,
                itemsets = ?frequent.keys().collect::<Vec<_>>(),
                "frequent itemsets of length {length}"
            );
        }
    }
}

fn attach_transaction_ids<T: Item>(
    index: &TransactionIndex<T>,
    by_length: &mut BTreeMap<usize, BTreeMap<Itemset<T>, ItemsetCount>>,
) {
    for level in by_length.values_mut() {
        for (itemset, entry) in level.iter_mut() {
            let ids: HashSet<usize> = index.transaction_ids(itemset);
            entry.transaction_ids = Some(ids.into_iter().collect());
        }
    }
}

/// Mines frequent itemsets from in-memory transactions.
pub fn mine_itemsets<T, I, Tx>(
    transactions: I,
    params: &MiningParams,
) -> Result<FrequentItemsets<T>, MiningError>
where
    T: Item + Send + Sync,
    I: IntoIterator<Item = Tx>,
    Tx: IntoIterator<Item = T>,
{
    let miner = FrequentItemsetMiner::new(params.clone())?;
    let index = TransactionIndex::build(transactions);
    Ok(miner.mine(&index))
}

/// Like [`mine_itemsets`] for a source whose transactions may fail to load.
pub fn try_mine_itemsets<T, I, Tx, E>(
    transactions: I,
    params: &MiningParams,
) -> Result<FrequentItemsets<T>, MiningError>
where
    T: Item + Send + Sync,
    I: IntoIterator<Item = Result<Tx, E>>,
    Tx: IntoIterator<Item = T>,
    E: std::fmt::Display,
{
    let miner = FrequentItemsetMiner::new(params.clone())?;
    let index = TransactionIndex::try_build(transactions)?;
    Ok(miner.mine(&index))
}
