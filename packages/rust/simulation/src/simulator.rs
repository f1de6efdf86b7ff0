//! The [`Simulator`] contract and its completion-backed implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use arrs_shared::{AnalysisId, Result, SimulationResult};

use crate::backend::CompletionBackend;
use crate::citation::CitationAnalyzer;
use crate::prompts::{SHOPPING_ASSISTANT, attribute_prompt, recommendation_prompt};

/// Who to look for, and in which recommendation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRequest {
    pub brand: String,
    pub category: String,
    pub use_case: String,
}

impl SimulationRequest {
    /// A request only when all three parts are present and non-blank.
    pub fn from_parts(
        brand: Option<&str>,
        category: Option<&str>,
        use_case: Option<&str>,
    ) -> Option<Self> {
        let part = |p: Option<&str>| p.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        Some(Self {
            brand: part(brand)?,
            category: part(category)?,
            use_case: part(use_case)?,
        })
    }
}

/// Asks an AI-recommendation backend whether it would cite a brand.
#[async_trait]
pub trait Simulator: Send + Sync {
    /// Backend label for logs.
    fn name(&self) -> &str;

    async fn simulate(
        &self,
        analysis_id: AnalysisId,
        request: &SimulationRequest,
    ) -> Result<SimulationResult>;
}

/// Two-prompt simulation over any [`CompletionBackend`].
///
/// The recommendation prompt decides citation; the attribute prompt lists
/// what the model wants to know about the brand. A failed attribute prompt
/// leaves the missing signals empty instead of failing the simulation.
pub struct RecommendationSimulator {
    backend: Box<dyn CompletionBackend>,
    analyzer: CitationAnalyzer,
}

impl RecommendationSimulator {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            analyzer: CitationAnalyzer::new(),
        }
    }

    async fn missing_signals(&self, request: &SimulationRequest) -> Vec<String> {
        let prompt = attribute_prompt(&request.brand, &request.category);
        match self.backend.complete(Some(SHOPPING_ASSISTANT), &prompt).await {
            Ok(response) => self.analyzer.important_attributes(&response),
            Err(e) => {
                warn!(error = %e, "attribute prompt failed; no missing signals recorded");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Simulator for RecommendationSimulator {
    fn name(&self) -> &str {
        self.backend.provider()
    }

    #[instrument(skip_all, fields(analysis_id = %analysis_id, brand = %request.brand, provider = self.backend.provider()))]
    async fn simulate(
        &self,
        analysis_id: AnalysisId,
        request: &SimulationRequest,
    ) -> Result<SimulationResult> {
        let prompt = recommendation_prompt(&request.category, &request.use_case);
        let response = self
            .backend
            .complete(Some(SHOPPING_ASSISTANT), &prompt)
            .await?;

        let citation = self.analyzer.analyze(&response, &request.brand);
        let missing_signals = self.missing_signals(request).await;

        info!(
            brand_cited = citation.cited,
            citation_count = citation.count,
            missing_signals = missing_signals.len(),
            "simulation complete"
        );

        Ok(SimulationResult {
            id: Uuid::now_v7(),
            analysis_id,
            prompt,
            response,
            brand_cited: citation.cited,
            citation_count: citation.count,
            missing_signals,
            metadata: json!({
                "provider": self.backend.provider(),
                "model": self.backend.model(),
                "brand": request.brand,
                "product_category": request.category,
                "use_case": request.use_case,
                "citation_contexts": citation.contexts,
                "sentiment": citation.sentiment,
            }),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrs_shared::{ArrsError, ErrorKind};
    use std::sync::Mutex;

    /// Replies from a script, one per call.
    struct ScriptedBackend {
        replies: Mutex<Vec<Result<String>>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String>>) -> Box<Self> {
            let mut replies = replies;
            replies.reverse();
            Box::new(Self {
                replies: Mutex::new(replies),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn provider(&self) -> &'static str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(&self, _system: Option<&str>, _prompt: &str) -> Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ArrsError::Simulation("script exhausted".into())))
        }
    }

    fn request() -> SimulationRequest {
        SimulationRequest::from_parts(Some("Acme"), Some("trail shoes"), Some("ultramarathons"))
            .unwrap()
    }

    #[test]
    fn request_requires_all_parts() {
        assert!(SimulationRequest::from_parts(Some("Acme"), Some("shoes"), None).is_none());
        assert!(SimulationRequest::from_parts(Some(" "), Some("shoes"), Some("running")).is_none());
        assert_eq!(request().brand, "Acme");
    }

    #[tokio::test]
    async fn cited_brand_with_attributes() {
        let simulator = RecommendationSimulator::new(ScriptedBackend::new(vec![
            Ok("1. Acme Trail Runner: excellent grip.\n2. Brand X".into()),
            Ok("1. Detailed specifications\n2. Warranty coverage terms".into()),
        ]));
        let id = AnalysisId::new();
        let result = simulator.simulate(id, &request()).await.unwrap();

        assert_eq!(result.analysis_id, id);
        assert!(result.brand_cited);
        assert_eq!(result.citation_count, 1);
        assert_eq!(
            result.missing_signals,
            vec!["Detailed specifications", "Warranty coverage terms"]
        );
        assert!(result.prompt.contains("trail shoes"));
        assert_eq!(result.metadata["provider"], "scripted");
        assert_eq!(result.metadata["sentiment"], "positive");
    }

    #[tokio::test]
    async fn attribute_failure_degrades_to_no_signals() {
        let simulator = RecommendationSimulator::new(ScriptedBackend::new(vec![
            Ok("Brand X and Brand Y".into()),
            Err(ArrsError::Simulation("timeout".into())),
        ]));
        let result = simulator.simulate(AnalysisId::new(), &request()).await.unwrap();
        assert!(!result.brand_cited);
        assert!(result.missing_signals.is_empty());
    }

    #[tokio::test]
    async fn recommendation_failure_is_simulation_error() {
        let simulator = RecommendationSimulator::new(ScriptedBackend::new(vec![Err(
            ArrsError::Simulation("connection refused".into()),
        )]));
        let err = simulator
            .simulate(AnalysisId::new(), &request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Simulation);
    }
}
