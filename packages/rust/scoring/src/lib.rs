//! Multi-engine scoring for ARRS.
//!
//! Three engines score one [`ParsedContent`](arrs_shared::ParsedContent)
//! independently:
//! - [`AdeEngine`]: attribute density
//! - [`ArceEngine`]: AI readability and composability
//! - [`TreEngine`]: transaction readiness
//!
//! [`composite_score`] folds their weighted results into one number and
//! [`GapSet`] merges their gaps with simulation-derived ones.

pub mod composite;
pub mod engines;
pub mod gaps;
pub mod primitives;
pub mod readability;

pub use composite::composite_score;
pub use engines::{AdeEngine, ArceEngine, EngineRegistry, ScoringEngine, TreEngine};
pub use gaps::{GapSet, TOP_GAPS, order_by_severity, simulation_gaps, top};
