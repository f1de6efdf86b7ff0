//! Read model assembled from a stored analysis.

use chrono::{DateTime, Utc};
use serde::Serialize;

use arrs_scoring::{order_by_severity, top};
use arrs_shared::{
    Analysis, AnalysisId, AnalysisStatus, EngineDetails, EngineScore, Gap, Severity,
    SimulationResult,
};

const RESPONSE_PREVIEW_CHARS: usize = 200;

/// Letter grade for a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Self::A,
            s if s >= 80.0 => Self::B,
            s if s >= 70.0 => Self::C,
            s if s >= 60.0 => Self::D,
            _ => Self::F,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineSummary {
    pub name: String,
    pub score: f64,
    pub weight: f64,
    pub details: EngineDetails,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GapCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

impl GapCounts {
    pub fn from_gaps(gaps: &[Gap]) -> Self {
        let mut counts = Self::default();
        for gap in gaps {
            match gap.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts.total = gaps.len();
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub brand_cited: bool,
    pub citation_count: u32,
    pub missing_signals: Vec<String>,
    /// First 200 characters of the response.
    pub response_preview: String,
}

impl SimulationSummary {
    fn from_result(result: SimulationResult) -> Self {
        let mut response_preview: String =
            result.response.chars().take(RESPONSE_PREVIEW_CHARS).collect();
        if result.response.chars().count() > RESPONSE_PREVIEW_CHARS {
            response_preview.push_str("...");
        }
        Self {
            brand_cited: result.brand_cited,
            citation_count: result.citation_count,
            missing_signals: result.missing_signals,
            response_preview,
        }
    }
}

/// Everything a report needs about one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub analysis_id: AnalysisId,
    pub url: String,
    pub status: AnalysisStatus,
    pub composite_score: Option<f64>,
    /// Present with the composite score.
    pub grade: Option<Grade>,
    pub error_message: Option<String>,
    pub engines: Vec<EngineSummary>,
    /// Severity ordered.
    pub gaps: Vec<Gap>,
    pub top_gaps: Vec<Gap>,
    pub gap_counts: GapCounts,
    pub simulation: Option<SimulationSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisSummary {
    pub fn build(
        analysis: Analysis,
        scores: Vec<EngineScore>,
        mut gaps: Vec<Gap>,
        simulation: Option<SimulationResult>,
    ) -> Self {
        order_by_severity(&mut gaps);

        Self {
            analysis_id: analysis.id,
            url: analysis.url,
            status: analysis.status,
            composite_score: analysis.composite_score,
            grade: analysis.composite_score.map(Grade::from_score),
            error_message: analysis.error_message,
            engines: scores
                .into_iter()
                .map(|s| EngineSummary {
                    name: s.engine_name,
                    score: s.score,
                    weight: s.weight,
                    details: s.details,
                })
                .collect(),
            top_gaps: top(&gaps).to_vec(),
            gap_counts: GapCounts::from_gaps(&gaps),
            gaps,
            simulation: simulation.map(SimulationSummary::from_result),
            created_at: analysis.created_at,
            updated_at: analysis.updated_at,
        }
    }
}
