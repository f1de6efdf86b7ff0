//! Gap aggregation: engine gaps plus simulation gaps, severity ordered.

use arrs_shared::{AI_SIMULATION_SOURCE, Gap, Severity, SimulationResult};

/// Size of the reporting view returned by [`top`].
pub const TOP_GAPS: usize = 10;

/// The merged gap set for one analysis.
///
/// Engine gaps come first, then simulation gaps; [`GapSet::finish`] then
/// stable-sorts by severity so equal-severity gaps keep generation order.
#[derive(Debug, Clone, Default)]
pub struct GapSet {
    gaps: Vec<Gap>,
}

impl GapSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend_engine(&mut self, gaps: impl IntoIterator<Item = Gap>) {
        self.gaps.extend(gaps);
    }

    pub fn extend_simulation(&mut self, result: &SimulationResult) {
        self.gaps.extend(simulation_gaps(result));
    }

    /// Severity-ordered gaps, consuming the set.
    pub fn finish(mut self) -> Vec<Gap> {
        order_by_severity(&mut self.gaps);
        self.gaps
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Stable sort, `critical` first.
pub fn order_by_severity(gaps: &mut [Gap]) {
    gaps.sort_by_key(|g| g.severity);
}

/// The first [`TOP_GAPS`] of an already ordered slice.
pub fn top(gaps: &[Gap]) -> &[Gap] {
    &gaps[..gaps.len().min(TOP_GAPS)]
}

/// Map a simulation result onto gaps.
///
/// An uncited brand is one critical `not_cited_by_ai`; each missing signal is
/// one medium `missing_attribute`.
pub fn simulation_gaps(result: &SimulationResult) -> Vec<Gap> {
    let mut gaps = Vec::with_capacity(result.missing_signals.len() + 1);

    if !result.brand_cited {
        gaps.push(Gap::new(
            result.analysis_id,
            "not_cited_by_ai",
            Severity::Critical,
            "Brand was not mentioned in AI recommendation",
            "Improve product attributes, trust signals, and content clarity to increase AI citation likelihood",
            AI_SIMULATION_SOURCE,
        ));
    }

    for signal in &result.missing_signals {
        gaps.push(Gap::new(
            result.analysis_id,
            "missing_attribute",
            Severity::Medium,
            format!("AI values this attribute but it may be missing: {signal}"),
            format!("Add or enhance information about: {signal}"),
            AI_SIMULATION_SOURCE,
        ));
    }

    gaps
}
