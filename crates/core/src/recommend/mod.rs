//! Basket recommendations
//!
//! Ranks association rules against a partial basket and suggests the
//! consequent items of the strongest applicable rules.

mod engine;
mod types;

pub use engine::{recommend, RecommendationEngine};
pub use types::*;

/// Recommendations returned when a request does not say otherwise
pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;
