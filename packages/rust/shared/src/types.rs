//! Core domain types for ARRS analyses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ArrsError, Result};

/// Source tag carried by gaps derived from an AI simulation.
pub const AI_SIMULATION_SOURCE: &str = "AI_SIMULATION";

// ---------------------------------------------------------------------------
// AnalysisId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for analysis identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(pub Uuid);

impl AnalysisId {
    /// Generate a new time-sortable analysis identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AnalysisId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Lifecycle state of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `completed` and `failed` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// `failed` is reachable from any non-terminal state; `completed` only
    /// from `processing`.
    pub fn can_transition_to(&self, next: AnalysisStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Processing) => true,
            (Self::Processing, Self::Completed) => true,
            (Self::Pending | Self::Processing, Self::Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = ArrsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ArrsError::validation(format!(
                "unknown analysis status '{other}'"
            ))),
        }
    }
}

/// One evaluation run for one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: AnalysisId,
    /// Target URL as requested by the caller.
    pub url: String,
    pub status: AnalysisStatus,
    /// Set exactly when `status` is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_score: Option<f64>,
    /// Free-form caller metadata (brand, category, use case, ...).
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Set exactly when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// CrawledContent
// ---------------------------------------------------------------------------

/// One acquired page, as stored alongside its analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledContent {
    pub id: Uuid,
    pub analysis_id: AnalysisId,
    /// URL the caller asked for.
    pub url: String,
    /// URL after redirects; HTTPS checks run against this one.
    pub final_url: String,
    pub markup: String,
    pub http_status: u16,
    /// Which fetch strategy produced the markup (`http`, `rendered`).
    pub method: String,
    /// SHA-256 of the markup, hex encoded.
    pub content_hash: String,
    pub crawled_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// EngineScore
// ---------------------------------------------------------------------------

/// Named sub-scores and raw signals recorded by an engine.
///
/// Gap rules read only from this map, so every signal a rule needs must be
/// written here during scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineDetails(pub BTreeMap<String, serde_json::Value>);

impl EngineDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(serde_json::Value::as_f64)
    }

    /// A missing or non-boolean entry reads as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.0
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    pub fn strings(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(serde_json::Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One engine's result for one analysis. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineScore {
    pub id: Uuid,
    pub analysis_id: AnalysisId,
    pub engine_name: String,
    /// 0 to 100.
    pub score: f64,
    /// 0.0 to 1.0, copied from the engine at scoring time.
    pub weight: f64,
    pub details: EngineDetails,
    pub created_at: DateTime<Utc>,
}

impl EngineScore {
    pub fn new(
        analysis_id: AnalysisId,
        engine_name: impl Into<String>,
        score: f64,
        weight: f64,
        details: EngineDetails,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            analysis_id,
            engine_name: engine_name.into(),
            score,
            weight,
            details,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Gap
// ---------------------------------------------------------------------------

/// Gap severity. Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = ArrsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(ArrsError::validation(format!("unknown severity '{other}'"))),
        }
    }
}

/// One actionable deficiency found during an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub id: Uuid,
    pub analysis_id: AnalysisId,
    /// Machine tag, e.g. `missing_schema` or `no_ssl`.
    pub gap_type: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
    /// Engine name, or [`AI_SIMULATION_SOURCE`].
    pub source: String,
}

impl Gap {
    pub fn new(
        analysis_id: AnalysisId,
        gap_type: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
        recommendation: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            analysis_id,
            gap_type: gap_type.into(),
            severity,
            description: description.into(),
            recommendation: recommendation.into(),
            source: source.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SimulationResult
// ---------------------------------------------------------------------------

/// Output of one AI-recommendation simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: Uuid,
    pub analysis_id: AnalysisId,
    pub prompt: String,
    pub response: String,
    pub brand_cited: bool,
    pub citation_count: u32,
    /// Attributes the backend values that the brand appears to lack.
    #[serde(default)]
    pub missing_signals: Vec<String>,
    /// Provider, model, citation contexts, sentiment.
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
