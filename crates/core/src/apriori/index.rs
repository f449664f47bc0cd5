use std::collections::{HashMap, HashSet};

use crate::errors::MiningError;
use crate::itemset::{Item, Itemset};

/// Result of a support count that may stop early.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FloorCheck {
    /// The itemset meets the floor; carries the covering transaction ids.
    Frequent(HashSet<usize>),
    /// The running intersection dropped below the floor before completing.
    BelowFloor,
}

impl FloorCheck {
    pub fn is_frequent(&self) -> bool {
        matches!(self, Self::Frequent(_))
    }
}

/// Inverted index from item to the ids of the transactions containing it.
///
/// Ids are positional and dense (`0..transaction_count`). The index is
/// immutable once built.
#[derive(Clone, Debug, Default)]
pub struct TransactionIndex<T: Item> {
    ids_by_item: HashMap<T, HashSet<usize>>,
    transaction_count: usize,
}

impl<T: Item> TransactionIndex<T> {
    pub fn build<I, Tx>(transactions: I) -> Self
    where
        I: IntoIterator<Item = Tx>,
        Tx: IntoIterator<Item = T>,
    {
        let mut ids_by_item: HashMap<T, HashSet<usize>> = HashMap::new();
        let mut transaction_count = 0;

        for (id, transaction) in transactions.into_iter().enumerate() {
            for item in transaction {
                ids_by_item.entry(item).or_default().insert(id);
            }
            transaction_count = id + 1;
        }

        Self { ids_by_item, transaction_count }
    }

    /// Builds from a fallible source, failing on the first bad transaction.
    pub fn try_build<I, Tx, E>(transactions: I) -> Result<Self, MiningError>
    where
        I: IntoIterator<Item = Result<Tx, E>>,
        Tx: IntoIterator<Item = T>,
        E: std::fmt::Display,
    {
        let mut ids_by_item: HashMap<T, HashSet<usize>> = HashMap::new();
        let mut transaction_count = 0;

        for (id, transaction) in transactions.into_iter().enumerate() {
            let transaction = transaction.map_err(|error| {
                MiningError::invalid_input(format!("transaction {id} could not be read: {error}"))
            })?;
            for item in transaction {
                ids_by_item.entry(item).or_default().insert(id);
            }
            transaction_count = id + 1;
        }

        Ok(Self { ids_by_item, transaction_count })
    }

    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_count == 0
    }

    /// Number of distinct items.
    pub fn len(&self) -> usize {
        self.ids_by_item.len()
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.ids_by_item.keys()
    }

    /// Ids of the transactions containing `item`.
    pub fn ids_for(&self, item: &T) -> Option<&HashSet<usize>> {
        self.ids_by_item.get(item)
    }

    pub fn item_count(&self, item: &T) -> usize {
        self.ids_by_item.get(item).map_or(0, HashSet::len)
    }

    /// Exact number of transactions containing every item of `itemset`.
    ///
    /// Returns 0 for an empty itemset; callers should not ask.
    pub fn support_count(&self, itemset: &Itemset<T>) -> usize {
        self.transaction_ids(itemset).len()
    }

    /// Full intersection of the per-item id sets, smallest set first.
    pub fn transaction_ids(&self, itemset: &Itemset<T>) -> HashSet<usize> {
        let Some(mut sets) = self.sets_rarest_first(itemset) else {
            return HashSet::new();
        };
        if sets.is_empty() {
            return HashSet::new();
        }

        let mut running = sets.remove(0).clone();
        for set in sets {
            if running.is_empty() {
                break;
            }
            running.retain(|id| set.contains(id));
        }
        running
    }

    /// Intersects rarest-first and gives up as soon as the running support
    /// falls below `min_support` (measured against the full transaction count).
    pub fn support_count_with_floor(&self, itemset: &Itemset<T>, min_support: f64) -> FloorCheck {
        if self.transaction_count == 0 {
            return FloorCheck::BelowFloor;
        }
        let Some(sets) = self.sets_rarest_first(itemset) else {
            // an unindexed item has support 0
            return if min_support > 0.0 {
                FloorCheck::BelowFloor
            } else {
                FloorCheck::Frequent(HashSet::new())
            };
        };
        let mut sets = sets.into_iter();
        let Some(first) = sets.next() else {
            return FloorCheck::BelowFloor;
        };

        if self.support_of(first.len()) < min_support {
            return FloorCheck::BelowFloor;
        }

        let mut running = first.clone();
        for set in sets {
            running.retain(|id| set.contains(id));
            if self.support_of(running.len()) < min_support {
                return FloorCheck::BelowFloor;
            }
        }

        FloorCheck::Frequent(running)
    }

    fn support_of(&self, count: usize) -> f64 {
        count as f64 / self.transaction_count as f64
    }

    /// `None` when some item is absent from the index entirely.
    fn sets_rarest_first(&self, itemset: &Itemset<T>) -> Option<Vec<&HashSet<usize>>> {
        let mut sets = itemset
            .items()
            .iter()
            .map(|item| self.ids_by_item.get(item))
            .collect::<Option<Vec<_>>>()?;
        sets.sort_by_key(|set| set.len());
        Some(sets)
    }
}
