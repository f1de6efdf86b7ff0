//! Numeric building blocks shared by the engines.
//!
//! Every helper returns points in `[0, max]` so engine totals stay bounded
//! no matter how degenerate the input is.

/// `present / expected × max`. An empty expectation earns full credit.
pub fn completeness_points(present: usize, expected: usize, max: f64) -> f64 {
    if expected == 0 {
        return max;
    }
    clamp(present as f64 / expected as f64, 0.0, 1.0) * max
}

/// Length against a benchmark: `min(1, chars / benchmark) × max`.
pub fn richness_points(chars: usize, benchmark: usize, max: f64) -> f64 {
    ratio_points(chars as f64, benchmark as f64, max)
}

/// `min(1, numerator / denominator) × max`; a zero denominator earns nothing.
pub fn ratio_points(numerator: f64, denominator: f64, max: f64) -> f64 {
    if denominator <= 0.0 || !numerator.is_finite() {
        return 0.0;
    }
    clamp(numerator / denominator, 0.0, 1.0) * max
}

/// `count × per_hit`, capped at `cap`.
pub fn capped_points(count: usize, per_hit: f64, cap: f64) -> f64 {
    (count as f64 * per_hit).min(cap)
}

/// `value` limited to `[lo, hi]`; NaN collapses to `lo`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.clamp(lo, hi)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whether any of `keywords` occurs in already-lowercased `text`.
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Number of `keywords` occurring in already-lowercased `text`.
pub fn keyword_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_handles_empty_expectation() {
        assert_eq!(completeness_points(0, 0, 40.0), 40.0);
        assert_eq!(completeness_points(5, 10, 40.0), 20.0);
        assert_eq!(completeness_points(12, 10, 40.0), 40.0);
    }

    #[test]
    fn ratio_is_capped_and_zero_safe() {
        assert_eq!(ratio_points(3.0, 0.0, 10.0), 0.0);
        assert_eq!(ratio_points(600.0, 300.0, 15.0), 15.0);
        assert_eq!(richness_points(150, 300, 15.0), 7.5);
    }

    #[test]
    fn capped_points_stop_at_cap() {
        assert_eq!(capped_points(3, 2.0, 10.0), 6.0);
        assert_eq!(capped_points(9, 2.0, 10.0), 10.0);
    }

    #[test]
    fn clamp_and_round() {
        assert_eq!(clamp(f64::NAN, 0.0, 100.0), 0.0);
        assert_eq!(clamp(-4.0, 0.0, 25.0), 0.0);
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(12.344), 12.34);
    }

    #[test]
    fn keyword_matching() {
        let text = "free shipping and a 30-day return policy";
        assert!(contains_any(text, &["refund", "return policy"]));
        assert!(!contains_any(text, &["paypal"]));
        assert_eq!(keyword_hits(text, &["shipping", "return", "visa"]), 2);
    }
}
