//! End-to-end analysis run: URL → acquire → extract → score → gaps →
//! simulate → persist.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use arrs_crawler::{FetchedDocument, Fetcher, HttpFetcher, RenderFetcher};
use arrs_extractor::{Extractor, HtmlExtractor};
use arrs_scoring::{EngineRegistry, GapSet, ScoringEngine, composite_score};
use arrs_shared::{
    AnalysisId, AnalysisStatus, AppConfig, ArrsError, CrawledContent, EngineScore, ErrorKind, Gap,
    ParsedContent, Result, SimulationResult,
};
use arrs_simulation::{SimulationRequest, Simulator, build_simulator};
use arrs_storage::{Repository, Storage};

use crate::summary::AnalysisSummary;

/// What to analyze, and who to look for in the AI simulation.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub url: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub use_case: Option<String>,
    /// Extra caller metadata stored with the analysis.
    pub metadata: serde_json::Value,
}

impl AnalysisRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_use_case(mut self, use_case: impl Into<String>) -> Self {
        self.use_case = Some(use_case.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    fn simulation_request(&self) -> Option<SimulationRequest> {
        SimulationRequest::from_parts(
            self.brand.as_deref(),
            self.category.as_deref(),
            self.use_case.as_deref(),
        )
    }

    /// Caller metadata plus the simulation inputs that were supplied.
    fn stored_metadata(&self) -> serde_json::Value {
        let mut map = match &self.metadata {
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("extra".into(), other.clone());
                map
            }
        };
        for (key, value) in [
            ("brand", &self.brand),
            ("product_category", &self.category),
            ("use_case", &self.use_case),
        ] {
            if let Some(value) = value {
                map.insert(key.into(), value.clone().into());
            }
        }
        serde_json::Value::Object(map)
    }
}

/// Result of a completed analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis_id: AnalysisId,
    pub composite_score: f64,
    /// Scores of the engines that succeeded, in registry order.
    pub engine_scores: Vec<EngineScore>,
    /// Engines that failed and were left out of the composite.
    pub failed_engines: Vec<String>,
    /// Severity ordered.
    pub gaps: Vec<Gap>,
    pub simulation: Option<SimulationResult>,
    /// Tag of the fetcher that produced the markup.
    pub fetch_method: String,
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each engine that produced a score.
    fn engine_scored(&self, engine: &str, score: f64);
    /// Called for each engine left out of the composite.
    fn engine_failed(&self, engine: &str, error: &ArrsError);
    /// Called when the run completes.
    fn done(&self, outcome: &AnalysisOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn engine_scored(&self, _engine: &str, _score: f64) {}
    fn engine_failed(&self, _engine: &str, _error: &ArrsError) {}
    fn done(&self, _outcome: &AnalysisOutcome) {}
}

/// Runs analyses against a fixed set of collaborators.
pub struct Orchestrator {
    primary: Arc<dyn Fetcher>,
    fallback: Option<Arc<dyn Fetcher>>,
    extractor: Arc<dyn Extractor>,
    registry: EngineRegistry,
    simulator: Option<Arc<dyn Simulator>>,
    repository: Arc<dyn Repository>,
    parallel: bool,
}

impl Orchestrator {
    /// An orchestrator with no fallback fetcher and no simulator, scoring
    /// engines in parallel.
    pub fn new(
        primary: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        registry: EngineRegistry,
        repository: Arc<dyn Repository>,
    ) -> Self {
        Self {
            primary,
            fallback: None,
            extractor,
            registry,
            simulator: None,
            repository,
            parallel: true,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Fetcher>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_simulator(mut self, simulator: Option<Arc<dyn Simulator>>) -> Self {
        self.simulator = simulator;
        self
    }

    /// Score engines on the blocking pool (`true`) or one after another.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Wire the default collaborators from configuration.
    pub fn from_config(config: &AppConfig, repository: Arc<dyn Repository>) -> Result<Self> {
        config.validate()?;

        let mut orchestrator = Self::new(
            Arc::new(HttpFetcher::new(&config.crawler)?),
            Arc::new(HtmlExtractor::new()),
            EngineRegistry::from_config(&config.scoring)?,
            repository,
        )
        .parallel(config.scoring.parallel)
        .with_simulator(build_simulator(&config.simulation)?);

        if config.crawler.render_fallback {
            orchestrator = orchestrator.with_fallback(Arc::new(RenderFetcher::new(&config.crawler)?));
        }

        info!(
            engines = ?orchestrator.registry.names(),
            fallback = orchestrator.fallback.is_some(),
            simulation = orchestrator.simulator.is_some(),
            "orchestrator ready"
        );
        Ok(orchestrator)
    }

    /// [`from_config`](Self::from_config) over the configured libSQL database.
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let storage = Storage::from_config(&config.storage).await?;
        Self::from_config(config, Arc::new(storage))
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    /// Run one analysis to a terminal state.
    ///
    /// Any fatal error marks the analysis `failed` with the error message
    /// and is then returned unchanged.
    #[instrument(skip_all, fields(url = %request.url))]
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<AnalysisOutcome> {
        let analysis = self
            .repository
            .create_analysis(&request.url, request.stored_metadata())
            .await?;
        let id = analysis.id;
        info!(analysis_id = %id, "starting analysis");

        match self.run(id, request, progress).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(analysis_id = %id, error = %e, "analysis failed");
                if let Err(mark_err) = self
                    .repository
                    .update_status(id, AnalysisStatus::Failed, Some(&e.to_string()))
                    .await
                {
                    warn!(analysis_id = %id, error = %mark_err, "could not mark analysis failed");
                }
                Err(e)
            }
        }
    }

    /// Read model for a stored analysis.
    pub async fn summary(&self, id: AnalysisId) -> Result<AnalysisSummary> {
        let analysis = self
            .repository
            .get_analysis(id)
            .await?
            .ok_or_else(|| ArrsError::validation(format!("analysis {id} not found")))?;
        let scores = self.repository.get_engine_scores(id).await?;
        let gaps = self.repository.get_gaps(id).await?;
        let simulation = self.repository.get_simulation_result(id).await?;
        Ok(AnalysisSummary::build(analysis, scores, gaps, simulation))
    }

    async fn run(
        &self,
        id: AnalysisId,
        request: &AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<AnalysisOutcome> {
        let start = Instant::now();
        self.repository
            .update_status(id, AnalysisStatus::Processing, None)
            .await?;

        // --- Phase 1: Acquisition ---
        progress.phase("Fetching page");
        let document = self.acquire(&request.url).await?;
        let fetch_method = document.method.clone();
        let crawled = document.into_crawled(id, &request.url);
        self.repository.save_crawled_content(&crawled).await?;

        // --- Phase 2: Extraction ---
        progress.phase("Extracting content");
        let parsed = Arc::new(self.extract(&crawled).await?);
        let crawled = Arc::new(crawled);

        // --- Phase 3: Scoring ---
        progress.phase("Scoring");
        let mut scored: Vec<(Arc<dyn ScoringEngine>, EngineScore)> = Vec::new();
        let mut failed_engines = Vec::new();
        for (engine, result) in self.score_engines(&crawled, &parsed).await {
            match stage_policy(result)? {
                Ok(score) => {
                    debug!(engine = engine.name(), score = score.score, "engine scored");
                    progress.engine_scored(engine.name(), score.score);
                    scored.push((engine, score));
                }
                Err(e) => {
                    warn!(engine = engine.name(), error = %e, "engine failed, excluded from composite");
                    progress.engine_failed(engine.name(), &e);
                    failed_engines.push(engine.name().to_string());
                }
            }
        }

        // --- Phase 4: Gaps ---
        let mut gap_set = GapSet::new();
        for (engine, score) in &scored {
            gap_set.extend_engine(engine.identify_gaps(score, &parsed));
        }

        // --- Phase 5: Simulation ---
        let simulation = self.simulate(id, request, progress).await?;
        if let Some(result) = &simulation {
            gap_set.extend_simulation(result);
        }

        // --- Phase 6: Persist ---
        progress.phase("Saving results");
        let engine_scores: Vec<EngineScore> = scored.into_iter().map(|(_, s)| s).collect();
        let composite = composite_score(&engine_scores);
        for score in &engine_scores {
            self.repository.save_engine_score(score).await?;
        }
        let gaps = gap_set.finish();
        self.repository.save_gaps(id, &gaps).await?;
        self.repository.update_composite_score(id, composite).await?;
        self.repository
            .update_status(id, AnalysisStatus::Completed, None)
            .await?;

        let outcome = AnalysisOutcome {
            analysis_id: id,
            composite_score: composite,
            engine_scores,
            failed_engines,
            gaps,
            simulation,
            fetch_method,
            elapsed: start.elapsed(),
        };
        progress.done(&outcome);

        info!(
            analysis_id = %id,
            composite = outcome.composite_score,
            gaps = outcome.gaps.len(),
            method = %outcome.fetch_method,
            elapsed_ms = outcome.elapsed.as_millis(),
            "analysis complete"
        );
        Ok(outcome)
    }

    /// Primary fetcher, then the fallback once. The fallback's error wins.
    async fn acquire(&self, url: &str) -> Result<FetchedDocument> {
        let primary_err = match self.primary.fetch(url).await {
            Ok(document) => return Ok(document),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(crawl_failed(url, &primary_err));
        };

        warn!(
            method = self.primary.method(),
            fallback = fallback.method(),
            error = %primary_err,
            "primary fetch failed, trying fallback"
        );
        fallback
            .fetch(url)
            .await
            .map_err(|e| crawl_failed(url, &e))
    }

    async fn extract(&self, crawled: &CrawledContent) -> Result<ParsedContent> {
        let extractor = Arc::clone(&self.extractor);
        let markup = crawled.markup.clone();
        let base_url = crawled.final_url.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&markup, &base_url))
            .await
            .map_err(|e| ArrsError::extraction(format!("extraction task failed: {e}")))?
    }

    /// Every engine's result, in registry order, each attributed to its
    /// engine.
    ///
    /// Engines always run on the blocking pool so a panic surfaces as that
    /// engine's error. Sequential mode awaits each task before spawning the
    /// next.
    async fn score_engines(
        &self,
        crawled: &Arc<CrawledContent>,
        parsed: &Arc<ParsedContent>,
    ) -> Vec<(Arc<dyn ScoringEngine>, Result<EngineScore>)> {
        let engines = self.registry.engines();
        let mut results = Vec::with_capacity(engines.len());

        if !self.parallel {
            for engine in engines {
                let handle = spawn_score(engine, crawled, parsed);
                results.push((Arc::clone(engine), join_score(engine.name(), handle).await));
            }
            return results;
        }

        let handles: Vec<_> = engines
            .iter()
            .map(|engine| spawn_score(engine, crawled, parsed))
            .collect();
        for (engine, handle) in engines.iter().zip(handles) {
            results.push((Arc::clone(engine), join_score(engine.name(), handle).await));
        }
        results
    }

    /// `Ok(None)` when simulation is off, inputs are missing, or the
    /// simulator failed. Only a failed save is an error.
    async fn simulate(
        &self,
        id: AnalysisId,
        request: &AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<Option<SimulationResult>> {
        let Some(simulator) = &self.simulator else {
            return Ok(None);
        };
        let Some(simulation_request) = request.simulation_request() else {
            debug!("brand, category or use case missing; skipping simulation");
            return Ok(None);
        };

        progress.phase("Simulating AI recommendation");
        let outcome = simulator
            .simulate(id, &simulation_request)
            .await
            .map_err(attribute_to_simulation);
        match stage_policy(outcome)? {
            Ok(result) => {
                self.repository.save_simulation_result(&result).await?;
                Ok(Some(result))
            }
            Err(e) => {
                warn!(simulator = simulator.name(), error = %e, "simulation failed, skipping");
                Ok(None)
            }
        }
    }
}

type ScoreHandle = tokio::task::JoinHandle<Result<EngineScore>>;

fn spawn_score(
    engine: &Arc<dyn ScoringEngine>,
    crawled: &Arc<CrawledContent>,
    parsed: &Arc<ParsedContent>,
) -> ScoreHandle {
    let engine = Arc::clone(engine);
    let crawled = Arc::clone(crawled);
    let parsed = Arc::clone(parsed);
    tokio::task::spawn_blocking(move || engine.score(&crawled, &parsed))
}

async fn join_score(engine: &str, handle: ScoreHandle) -> Result<EngineScore> {
    match handle.await {
        Ok(result) => result.map_err(|e| attribute_to_engine(engine, e)),
        Err(e) => Err(ArrsError::engine(engine, format!("engine task failed: {e}"))),
    }
}

/// Anything an engine returns is that engine's failure.
fn attribute_to_engine(engine: &str, e: ArrsError) -> ArrsError {
    match e.kind() {
        ErrorKind::Engine => e,
        _ => ArrsError::engine(engine, e.to_string()),
    }
}

/// Anything the simulator returns is a simulation failure.
fn attribute_to_simulation(e: ArrsError) -> ArrsError {
    match e.kind() {
        ErrorKind::Simulation => e,
        _ => ArrsError::Simulation(e.to_string()),
    }
}

/// Stage policy by error kind: fatal errors end the run, the rest are
/// handed back for the stage to absorb.
fn stage_policy<T>(result: Result<T>) -> Result<std::result::Result<T, ArrsError>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => Ok(Err(e)),
    }
}

fn crawl_failed(url: &str, cause: &ArrsError) -> ArrsError {
    let detail = match cause {
        ArrsError::Acquisition(message) => message.clone(),
        other => other.to_string(),
    };
    ArrsError::Acquisition(format!("Failed to crawl {url}: {detail}"))
}
