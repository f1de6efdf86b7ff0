//! Engine trait and the ordered registry the orchestrator runs.
//!
//! Engines are stateless analyzers over one [`ParsedContent`]. Each one
//! scores in two phases: [`ScoringEngine::score`] records sub-scores and raw
//! signals in the score's details map, then [`ScoringEngine::identify_gaps`]
//! reads those details back to explain the score.

mod ade;
mod arce;
mod tre;

use std::sync::Arc;

use arrs_shared::{
    ArrsError, CrawledContent, EngineDetails, EngineScore, Gap, ParsedContent, Result,
    ScoringConfig, Severity,
};

pub use ade::AdeEngine;
pub use arce::ArceEngine;
pub use tre::TreEngine;

use crate::primitives::clamp;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One independently weighted scoring engine.
pub trait ScoringEngine: Send + Sync {
    /// Short engine tag (`ADE`, `ARCE`, `TRE`); also the gap source.
    fn name(&self) -> &str;

    /// Composite coefficient in `[0, 1]`, fixed at construction.
    fn weight(&self) -> f64;

    /// Pure scoring pass. The returned score is within `[0, 100]`.
    fn score(&self, content: &CrawledContent, parsed: &ParsedContent) -> Result<EngineScore>;

    /// Gaps explaining `score`, derived from its details and the parsed record.
    fn identify_gaps(&self, score: &EngineScore, parsed: &ParsedContent) -> Vec<Gap>;
}

/// Assemble an [`EngineScore`] from summed sub-scores.
///
/// A non-finite total is an engine error; anything else is clamped to
/// `[0, 100]`.
pub(crate) fn finish_score(
    engine: &dyn ScoringEngine,
    content: &CrawledContent,
    total: f64,
    details: EngineDetails,
) -> Result<EngineScore> {
    if !total.is_finite() {
        return Err(ArrsError::engine(
            engine.name(),
            format!("non-finite score {total}"),
        ));
    }
    Ok(EngineScore::new(
        content.analysis_id,
        engine.name(),
        clamp(total, 0.0, 100.0),
        engine.weight(),
        details,
    ))
}

/// A gap attributed to the engine that produced `score`.
pub(crate) fn engine_gap(
    score: &EngineScore,
    gap_type: impl Into<String>,
    severity: Severity,
    description: impl Into<String>,
    recommendation: impl Into<String>,
) -> Gap {
    Gap::new(
        score.analysis_id,
        gap_type,
        severity,
        description,
        recommendation,
        score.engine_name.clone(),
    )
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Engines in execution order.
///
/// Shared handles so the orchestrator can move engines onto the blocking
/// pool.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: Vec<Arc<dyn ScoringEngine>>,
}

impl EngineRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the enabled engines named in `config`, in config order.
    pub fn from_config(config: &ScoringConfig) -> Result<Self> {
        let mut registry = Self::new();
        for entry in config.engines.iter().filter(|e| e.enabled) {
            if !(0.0..=1.0).contains(&entry.weight) {
                return Err(ArrsError::config(format!(
                    "engine {} weight {} is outside [0, 1]",
                    entry.name, entry.weight
                )));
            }
            let engine: Arc<dyn ScoringEngine> = match entry.name.to_ascii_uppercase().as_str() {
                ade::NAME => Arc::new(AdeEngine::new(entry.weight)),
                arce::NAME => Arc::new(ArceEngine::new(entry.weight)),
                tre::NAME => Arc::new(TreEngine::new(entry.weight)),
                other => {
                    return Err(ArrsError::config(format!("unknown scoring engine '{other}'")));
                }
            };
            registry.register(engine);
        }
        Ok(registry)
    }

    /// Append an engine after the existing ones.
    pub fn register(&mut self, engine: Arc<dyn ScoringEngine>) {
        self.engines.push(engine);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, engine: Arc<dyn ScoringEngine>) -> Self {
        self.register(engine);
        self
    }

    pub fn engines(&self) -> &[Arc<dyn ScoringEngine>] {
        &self.engines
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ScoringEngine>> {
        self.engines
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.names())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use arrs_shared::{AnalysisId, CrawledContent, ParsedContent};
    use chrono::Utc;
    use uuid::Uuid;

    pub fn crawled(final_url: &str) -> CrawledContent {
        CrawledContent {
            id: Uuid::now_v7(),
            analysis_id: AnalysisId::new(),
            url: final_url.to_string(),
            final_url: final_url.to_string(),
            markup: String::new(),
            http_status: 200,
            method: "http".into(),
            content_hash: String::new(),
            crawled_at: Utc::now(),
        }
    }

    /// Nothing at all: no text, images, schema or metadata.
    pub fn empty_parsed() -> ParsedContent {
        ParsedContent::default()
    }
}
