//! Shared types, error model, and configuration for ARRS.
//!
//! This crate is the foundation depended on by all other ARRS crates.
//! It provides:
//! - [`ArrsError`], the unified error type, and its [`ErrorKind`] classification
//! - Domain types ([`Analysis`], [`EngineScore`], [`Gap`], [`SimulationResult`])
//! - The [`ParsedContent`] record engines score against
//! - Configuration ([`AppConfig`], config loading) and tracing setup

pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlerConfig, EngineConfig, ScoringConfig, SimulationConfig, SimulationProvider,
    StorageConfig, api_key_from_env, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use content::{
    Heading, HeadingSummary, Image, Offer, PRODUCT_FIELDS, PageMetadata, ParsedContent,
    ProductValidation, ReviewSummary, SEMANTIC_TAGS, StructuredData, is_truthy,
};
pub use error::{ArrsError, ErrorKind, Result};
pub use logging::{LogFormat, init_tracing};
pub use types::{
    AI_SIMULATION_SOURCE, Analysis, AnalysisId, AnalysisStatus, CrawledContent, EngineDetails,
    EngineScore, Gap, Severity, SimulationResult,
};
