//! Types for the recommendation engine

use std::collections::BTreeSet;

use serde::Serialize;

use crate::itemset::{Item, Itemset};

/// Request for basket recommendations
#[derive(Debug, Clone)]
pub struct RecommendationRequest<T: Item> {
    /// Items already in the basket
    pub basket: BTreeSet<T>,
    /// Maximum number of items to return
    pub max_recommendations: usize,
}

impl<T: Item> RecommendationRequest<T> {
    /// Create a request for the given basket
    pub fn new(basket: impl IntoIterator<Item = T>) -> Self {
        Self {
            basket: basket.into_iter().collect(),
            max_recommendations: super::DEFAULT_MAX_RECOMMENDATIONS,
        }
    }

    /// Set max recommendations
    pub fn with_max_recommendations(mut self, max: usize) -> Self {
        self.max_recommendations = max;
        self
    }
}

/// A recommended item together with the rule that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation<T> {
    /// Suggested item
    pub item: T,
    /// Confidence of the contributing rule
    pub confidence: Option<f64>,
    /// Lift of the contributing rule
    pub lift: Option<f64>,
    /// Basket items that triggered the rule
    pub because_of: Itemset<T>,
}
