//! Analysis orchestration for ARRS.
//!
//! This crate ties together acquisition, extraction, scoring, simulation and
//! persistence into one run per URL ([`Orchestrator::analyze`]) and reads
//! stored runs back as [`AnalysisSummary`] reports.

pub mod orchestrator;
pub mod summary;

pub use orchestrator::{
    AnalysisOutcome, AnalysisRequest, Orchestrator, ProgressReporter, SilentProgress,
};
pub use summary::{AnalysisSummary, EngineSummary, GapCounts, Grade, SimulationSummary};
