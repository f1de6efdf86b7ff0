//! Attribute Density Engine: how much product detail an AI can lift from
//! the page.
//!
//! | sub-score | max |
//! |---|---|
//! | schema completeness | 40 |
//! | attribute richness | 30 |
//! | image quality | 20 |
//! | technical specs | 10 |

use tracing::debug;

use arrs_shared::{CrawledContent, EngineDetails, EngineScore, Gap, ParsedContent, Result, Severity};

use super::{ScoringEngine, engine_gap, finish_score};
use crate::primitives::{capped_points, keyword_hits, ratio_points, richness_points};

pub(crate) const NAME: &str = "ADE";

const SCHEMA_MAX: f64 = 40.0;
const RICHNESS_MAX: f64 = 30.0;
const DESCRIPTION_MAX: f64 = 15.0;
const DESCRIPTION_BENCHMARK: usize = 300;
const IDENTITY_BONUS: f64 = 7.5;
const SPECS_MAX: f64 = 10.0;

/// Descriptions shorter than this raise `short_description`.
const SHORT_DESCRIPTION: usize = 100;

/// Product fields whose absence is reported individually.
const KEY_FIELDS: [&str; 4] = ["name", "description", "image", "offers"];

const SPEC_KEYWORDS: [&str; 9] = [
    "specification",
    "dimensions",
    "weight",
    "material",
    "features",
    "technical",
    "details",
    "capacity",
    "size",
];

#[derive(Debug, Clone)]
pub struct AdeEngine {
    weight: f64,
}

impl AdeEngine {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl ScoringEngine for AdeEngine {
    fn name(&self) -> &str {
        NAME
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, content: &CrawledContent, parsed: &ParsedContent) -> Result<EngineScore> {
        let data = &parsed.structured_data;
        let validation = &data.product_validation;

        // Schema completeness
        let schema_score = if validation.present {
            validation.completeness.clamp(0.0, 1.0) * SCHEMA_MAX
        } else {
            0.0
        };

        // Attribute richness
        let product_description = data.product_text("description");
        let description = product_description
            .or_else(|| parsed.meta_description())
            .unwrap_or_default();
        let has_brand = data.brand.is_some();
        let has_identifier = ["sku", "gtin", "mpn"]
            .iter()
            .any(|f| data.product_field(f).is_some());
        let mut richness_score =
            richness_points(description.chars().count(), DESCRIPTION_BENCHMARK, DESCRIPTION_MAX);
        if has_brand {
            richness_score += IDENTITY_BONUS;
        }
        if has_identifier {
            richness_score += IDENTITY_BONUS;
        }
        let richness_score = richness_score.min(RICHNESS_MAX);

        // Image quality
        let image_count = parsed.images.len();
        let with_alt = parsed.images.iter().filter(|i| i.has_alt()).count();
        let alt_coverage = ratio_points(with_alt as f64, image_count as f64, 1.0);
        let image_score = if image_count == 0 {
            0.0
        } else {
            capped_points(image_count, 2.5, 10.0) + alt_coverage * 10.0
        };

        // Technical specs
        let text = parsed.text_content.to_lowercase();
        let spec_hits = keyword_hits(&text, &SPEC_KEYWORDS);
        let specs_score = capped_points(spec_hits, 2.0, SPECS_MAX);

        let total = schema_score + richness_score + image_score + specs_score;
        debug!(
            analysis_id = %content.analysis_id,
            schema_score, richness_score, image_score, specs_score, total,
            "ADE scored"
        );

        let details = EngineDetails::new()
            .with("schema_completeness_score", schema_score)
            .with("attribute_richness_score", richness_score)
            .with("image_quality_score", image_score)
            .with("technical_specs_score", specs_score)
            .with("product_schema_present", validation.present)
            .with("schema_field_count", validation.field_count)
            .with("missing_fields", validation.missing_fields.clone())
            .with(
                "description_length",
                product_description.map_or(0, |d| d.chars().count()),
            )
            .with("has_brand", has_brand)
            .with("has_identifier", has_identifier)
            .with("image_count", image_count)
            .with("alt_text_coverage", alt_coverage)
            .with("spec_keyword_hits", spec_hits);

        finish_score(self, content, total, details)
    }

    fn identify_gaps(&self, score: &EngineScore, _parsed: &ParsedContent) -> Vec<Gap> {
        let details = &score.details;
        let mut gaps = Vec::new();

        if !details.flag("product_schema_present") {
            gaps.push(engine_gap(
                score,
                "missing_schema",
                Severity::Critical,
                "Product schema.org markup is missing",
                "Add Product schema.org markup using JSON-LD format to help AI understand product attributes",
            ));
        }

        let missing = details.strings("missing_fields");
        for field in KEY_FIELDS.iter().filter(|f| missing.iter().any(|m| m == *f)) {
            gaps.push(engine_gap(
                score,
                format!("missing_field_{field}"),
                Severity::High,
                format!("Product schema missing '{field}' field"),
                format!("Add '{field}' to Product schema for better AI attribute extraction"),
            ));
        }

        let description_length = details.number("description_length").unwrap_or(0.0) as usize;
        if description_length < SHORT_DESCRIPTION {
            gaps.push(engine_gap(
                score,
                "short_description",
                Severity::Medium,
                format!("Product description is too short ({description_length} characters)"),
                "Expand product description to at least 300 characters with detailed attributes and benefits",
            ));
        }

        if details.number("image_count").unwrap_or(0.0) == 0.0 {
            gaps.push(engine_gap(
                score,
                "no_images",
                Severity::High,
                "No product images found",
                "Add product images with descriptive alt text",
            ));
        }

        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::test_support::{crawled, empty_parsed};
    use arrs_shared::{Image, ProductValidation};
    use serde_json::json;

    fn product_page() -> ParsedContent {
        let product = json!({
            "@type": "Product",
            "name": "Trail Runner 2",
            "image": "https://shop.example.com/a.jpg",
            "description": "x".repeat(320),
            "brand": {"name": "Acme"},
            "offers": {"price": "129.00", "priceCurrency": "USD"},
            "sku": "TR-2",
        });
        let mut parsed = ParsedContent {
            text_content: "Features and technical details: weight 280 g, material mesh".into(),
            images: (0..4)
                .map(|i| Image {
                    src: format!("https://shop.example.com/{i}.jpg"),
                    alt: Some("Shoe".into()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        parsed.structured_data.product_validation = ProductValidation::of(&product);
        parsed.structured_data.product = Some(product);
        parsed.structured_data.brand = Some("Acme".into());
        parsed
    }

    #[test]
    fn empty_page_scores_zero_with_core_gaps() {
        let engine = AdeEngine::new(0.3);
        let parsed = empty_parsed();
        let score = engine.score(&crawled("https://example.com/"), &parsed).unwrap();
        assert_eq!(score.score, 0.0);
        assert_eq!(score.weight, 0.3);

        let types: Vec<String> = engine
            .identify_gaps(&score, &parsed)
            .into_iter()
            .map(|g| g.gap_type)
            .collect();
        assert_eq!(
            types,
            vec![
                "missing_schema",
                "missing_field_name",
                "missing_field_description",
                "missing_field_image",
                "missing_field_offers",
                "short_description",
                "no_images",
            ]
        );
    }

    #[test]
    fn rich_product_page() {
        let engine = AdeEngine::new(0.3);
        let parsed = product_page();
        let score = engine.score(&crawled("https://example.com/"), &parsed).unwrap();
        let d = &score.details;

        // 6 of 10 fields present
        assert!((d.number("schema_completeness_score").unwrap() - 24.0).abs() < 1e-9);
        assert_eq!(d.number("attribute_richness_score"), Some(30.0));
        assert_eq!(d.number("image_quality_score"), Some(20.0));
        // features, technical, details, weight, material
        assert_eq!(d.number("technical_specs_score"), Some(10.0));
        assert!((score.score - 84.0).abs() < 1e-9);

        assert!(engine.identify_gaps(&score, &parsed).is_empty());
    }

    #[test]
    fn meta_description_feeds_richness_but_not_length_gap() {
        let engine = AdeEngine::new(0.3);
        let parsed = ParsedContent {
            meta_description: Some("m".repeat(150)),
            ..Default::default()
        };
        let score = engine.score(&crawled("https://example.com/"), &parsed).unwrap();
        assert_eq!(score.details.number("attribute_richness_score"), Some(7.5));
        assert_eq!(score.details.number("description_length"), Some(0.0));
        assert!(
            engine
                .identify_gaps(&score, &parsed)
                .iter()
                .any(|g| g.gap_type == "short_description")
        );
    }

    #[test]
    fn alt_coverage_scales_image_score() {
        let engine = AdeEngine::new(0.3);
        let parsed = ParsedContent {
            images: vec![
                Image {
                    src: "a.jpg".into(),
                    alt: Some("front".into()),
                    ..Default::default()
                },
                Image {
                    src: "b.jpg".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let score = engine.score(&crawled("https://example.com/"), &parsed).unwrap();
        assert_eq!(score.details.number("image_quality_score"), Some(10.0));
    }
}
