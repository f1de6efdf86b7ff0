//! AI Readability & Composability Engine: how easily a model can parse and
//! quote the page.
//!
//! | sub-score | max |
//! |---|---|
//! | semantic HTML | 30 |
//! | readability | 25 |
//! | heading hierarchy | 25 |
//! | metadata | 20 |

use tracing::debug;

use arrs_shared::{CrawledContent, EngineDetails, EngineScore, Gap, ParsedContent, Result, Severity};

use super::{ScoringEngine, engine_gap, finish_score};
use crate::primitives::{capped_points, clamp};
use crate::readability::flesch_reading_ease;

pub(crate) const NAME: &str = "ARCE";

const SEMANTIC_MAX: f64 = 30.0;
const READABILITY_MAX: f64 = 25.0;

/// Below this many characters readability is not measured.
const MIN_TEXT_CHARS: usize = 100;
const LOW_SEMANTIC_COUNT: usize = 5;
const POOR_READABILITY: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct ArceEngine {
    weight: f64,
}

impl ArceEngine {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

/// Flesch mapped onto `[0, 25]`: full credit at 60, linear to 25 between 30
/// and 60, linear to 12.5 below 30.
fn readability_points(flesch: f64) -> f64 {
    let points = if flesch >= 60.0 {
        READABILITY_MAX
    } else if flesch >= POOR_READABILITY {
        flesch / 60.0 * READABILITY_MAX
    } else {
        flesch / 30.0 * (READABILITY_MAX / 2.0)
    };
    clamp(points, 0.0, READABILITY_MAX)
}

impl ScoringEngine for ArceEngine {
    fn name(&self) -> &str {
        NAME
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, content: &CrawledContent, parsed: &ParsedContent) -> Result<EngineScore> {
        // Semantic HTML
        let semantic_count = parsed.semantic_element_count();
        let semantic_score = capped_points(semantic_count, 3.0, SEMANTIC_MAX);

        // Readability. Short text earns no readability points, but its
        // reading ease is still recorded for the gap rule.
        let measurable = parsed.text_content.chars().count() >= MIN_TEXT_CHARS;
        let flesch = flesch_reading_ease(&parsed.text_content);
        let readability_score = if measurable {
            readability_points(flesch)
        } else {
            0.0
        };

        // Heading hierarchy. A page with no H1 still earns the "not multiple"
        // credit.
        let headings = &parsed.heading_summary;
        let mut heading_score: f64 = 0.0;
        if headings.h1_count == 1 {
            heading_score += 10.0;
        }
        if !headings.multiple_h1 {
            heading_score += 10.0;
        }
        if headings.skipped_levels.is_empty() {
            heading_score += 5.0;
        }

        // Metadata
        let has_title = parsed.title.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_meta_description = parsed.meta_description().is_some();
        let has_canonical = parsed.metadata.canonical_url.is_some();
        let og_fields = parsed.metadata.open_graph.len();
        let metadata_score = [has_title, has_meta_description, og_fields >= 3, has_canonical]
            .iter()
            .filter(|present| **present)
            .count() as f64
            * 5.0;

        let total = semantic_score + readability_score + heading_score + metadata_score;
        debug!(
            analysis_id = %content.analysis_id,
            semantic_score, readability_score, heading_score, metadata_score, total,
            "ARCE scored"
        );

        let details = EngineDetails::new()
            .with("semantic_html_score", semantic_score)
            .with("readability_score", readability_score)
            .with("heading_hierarchy_score", heading_score)
            .with("metadata_score", metadata_score)
            .with("semantic_element_count", semantic_count)
            .with("flesch_reading_ease", flesch)
            .with("readability_measured", measurable)
            .with("has_valid_hierarchy", headings.valid_hierarchy)
            .with("has_h1", headings.has_h1)
            .with("multiple_h1", headings.multiple_h1)
            .with("has_meta_description", has_meta_description)
            .with("word_count", parsed.word_count);

        finish_score(self, content, total, details)
    }

    fn identify_gaps(&self, score: &EngineScore, _parsed: &ParsedContent) -> Vec<Gap> {
        let details = &score.details;
        let mut gaps = Vec::new();

        let semantic_count = details.number("semantic_element_count").unwrap_or(0.0) as usize;
        if semantic_count < LOW_SEMANTIC_COUNT {
            gaps.push(engine_gap(
                score,
                "low_semantic_html",
                Severity::Medium,
                format!("Only {semantic_count} semantic HTML elements found"),
                "Use semantic HTML5 elements (article, section, header, main) to improve AI content understanding",
            ));
        }

        if !details.flag("has_h1") {
            gaps.push(engine_gap(
                score,
                "missing_h1",
                Severity::High,
                "Page missing H1 heading",
                "Add a clear H1 heading that describes the page content",
            ));
        }

        if details.flag("multiple_h1") {
            gaps.push(engine_gap(
                score,
                "multiple_h1",
                Severity::Medium,
                "Page has multiple H1 headings",
                "Use only one H1 heading per page for clear content hierarchy",
            ));
        }

        let flesch = details.number("flesch_reading_ease").unwrap_or(0.0);
        if flesch < POOR_READABILITY {
            gaps.push(engine_gap(
                score,
                "poor_readability",
                Severity::Medium,
                format!("Content has poor readability (Flesch score: {flesch:.1})"),
                "Simplify sentences and use clearer language to improve AI comprehension",
            ));
        }

        if !details.flag("has_meta_description") {
            gaps.push(engine_gap(
                score,
                "missing_meta_description",
                Severity::Medium,
                "Meta description is missing",
                "Add a meta description (150-160 characters) summarizing the page content",
            ));
        }

        gaps
    }
}
