//! Weighted composite over the engines that actually scored.

use arrs_shared::EngineScore;

use crate::primitives::round2;

/// `Σ(score × weight) / Σ(weight)`, rounded to two decimals.
///
/// Engines that failed are simply absent from `scores`. A total weight of
/// exactly zero, including an empty slice, yields `0.0`.
pub fn composite_score(scores: &[EngineScore]) -> f64 {
    let total_weight: f64 = scores.iter().map(|s| s.weight).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    let weighted: f64 = scores.iter().map(|s| s.score * s.weight).sum();
    round2(weighted / total_weight)
}
