//! Canonical itemsets.
//!
//! An [`Itemset`] is always stored sorted and de-duplicated, so equality,
//! hashing and ordering all operate on the canonical sequence.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Anything that can appear in a transaction.
pub trait Item: Clone + Ord + Hash + fmt::Debug {}

impl<T: Clone + Ord + Hash + fmt::Debug> Item for T {}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Itemset<T>(Vec<T>);

impl<T: Item> Itemset<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let mut items: Vec<T> = items.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Self(items)
    }

    pub fn single(item: T) -> Self {
        Self(vec![item])
    }

    /// Wraps items the caller already holds in canonical order.
    pub(crate) fn from_sorted(items: Vec<T>) -> Self {
        debug_assert!(items.windows(2).all(|pair| pair[0] < pair[1]));
        Self(items)
    }

    pub fn items(&self) -> &[T] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.0.binary_search(item).is_ok()
    }

    pub fn last(&self) -> Option<&T> {
        self.0.last()
    }

    /// All items except the last one.
    pub fn prefix(&self) -> &[T] {
        match self.0.split_last() {
            Some((_, prefix)) => prefix,
            None => &[],
        }
    }

    pub fn without_index(&self, index: usize) -> Self {
        let mut items = self.0.clone();
        items.remove(index);
        Self(items)
    }

    /// Items of `self` that are not in `other`, preserving canonical order.
    pub fn difference(&self, other: &Itemset<T>) -> Self {
        Self(self.0.iter().filter(|item| !other.contains(item)).cloned().collect())
    }

    pub fn is_subset_of(&self, basket: &BTreeSet<T>) -> bool {
        self.0.iter().all(|item| basket.contains(item))
    }

    pub fn is_disjoint(&self, other: &Itemset<T>) -> bool {
        self.0.iter().all(|item| !other.contains(item))
    }

    pub fn union(&self, other: &Itemset<T>) -> Self {
        Self::new(self.0.iter().chain(other.0.iter()).cloned())
    }

    pub fn into_items(self) -> Vec<T> {
        self.0
    }
}

impl<T: Item> FromIterator<T> for Itemset<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'de, T> Deserialize<'de> for Itemset<T>
where
    T: Item + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<T>::deserialize(deserializer).map(Self::new)
    }
}

impl<T: fmt::Display> fmt::Display for Itemset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, item) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("}")
    }
}
