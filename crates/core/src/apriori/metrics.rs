//! Rule quality measures computed from raw counts.
//!
//! Every function returns `None` when a denominator is zero instead of
//! producing `NaN`/`inf` or panicking.

use serde::Serialize;

/// Added to the conviction denominator so that confidence = 1 stays finite.
pub const CONVICTION_EPSILON: f64 = 1e-9;

pub fn confidence(count_full: usize, count_antecedent: usize) -> Option<f64> {
    ratio(count_full, count_antecedent)
}

pub fn support(count_full: usize, num_transactions: usize) -> Option<f64> {
    ratio(count_full, num_transactions)
}

pub fn lift(
    count_full: usize,
    count_antecedent: usize,
    count_consequent: usize,
    num_transactions: usize,
) -> Option<f64> {
    let observed = support(count_full, num_transactions)?;
    let antecedent = ratio(count_antecedent, num_transactions)?;
    let consequent = ratio(count_consequent, num_transactions)?;
    let expected = antecedent * consequent;
    if expected == 0.0 {
        return None;
    }
    Some(observed / expected)
}

pub fn conviction(
    count_full: usize,
    count_antecedent: usize,
    count_consequent: usize,
    num_transactions: usize,
) -> Option<f64> {
    let confidence = confidence(count_full, count_antecedent)?;
    let consequent = ratio(count_consequent, num_transactions)?;
    Some((1.0 - consequent) / (1.0 - confidence + CONVICTION_EPSILON))
}

/// Rule power factor: confidence × support.
pub fn rpf(count_full: usize, count_antecedent: usize, num_transactions: usize) -> Option<f64> {
    Some(confidence(count_full, count_antecedent)? * support(count_full, num_transactions)?)
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator != 0).then(|| numerator as f64 / denominator as f64)
}

/// All measures for one rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RuleMetrics {
    pub confidence: Option<f64>,
    pub support: Option<f64>,
    pub lift: Option<f64>,
    pub conviction: Option<f64>,
    pub rpf: Option<f64>,
}

impl RuleMetrics {
    pub fn from_counts(
        count_full: usize,
        count_antecedent: usize,
        count_consequent: usize,
        num_transactions: usize,
    ) -> Self {
        Self {
            confidence: confidence(count_full, count_antecedent),
            support: support(count_full, num_transactions),
            lift: lift(count_full, count_antecedent, count_consequent, num_transactions),
            conviction: conviction(count_full, count_antecedent, count_consequent, num_transactions),
            rpf: rpf(count_full, count_antecedent, num_transactions),
        }
    }
}
