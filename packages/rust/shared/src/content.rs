//! The normalized parsed-content record every scoring engine reads.
//!
//! Produced once per analysis by an extractor; engines treat it as read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tags counted as semantic HTML5 elements.
pub const SEMANTIC_TAGS: [&str; 11] = [
    "article",
    "section",
    "nav",
    "aside",
    "header",
    "footer",
    "main",
    "figure",
    "figcaption",
    "mark",
    "time",
];

/// Product fields checked for schema completeness.
pub const PRODUCT_FIELDS: [&str; 10] = [
    "name",
    "image",
    "description",
    "brand",
    "offers",
    "sku",
    "gtin",
    "mpn",
    "aggregateRating",
    "review",
];

// ---------------------------------------------------------------------------
// ParsedContent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    /// Visible text, whitespace-normalized, scripts and styles removed.
    pub text_content: String,
    pub word_count: usize,
    /// Headings in document order.
    pub headings: Vec<Heading>,
    pub heading_summary: HeadingSummary,
    pub images: Vec<Image>,
    /// Absolute link targets.
    pub links: Vec<String>,
    /// Instance count for every tag in [`SEMANTIC_TAGS`].
    pub semantic_elements: BTreeMap<String, usize>,
    pub metadata: PageMetadata,
    pub structured_data: StructuredData,
}

impl ParsedContent {
    /// Total semantic element instances across all tags.
    pub fn semantic_element_count(&self) -> usize {
        self.semantic_elements.values().sum()
    }

    /// Non-empty meta description, if any.
    pub fn meta_description(&self) -> Option<&str> {
        self.meta_description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 1 through 6.
    pub level: u8,
    pub text: String,
}

/// Precomputed heading-hierarchy facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingSummary {
    pub has_h1: bool,
    pub h1_count: usize,
    pub multiple_h1: bool,
    /// `(from, to)` pairs of consecutive headings that jump more than one level down.
    pub skipped_levels: Vec<(u8, u8)>,
    /// Exactly one H1 and no skipped levels.
    pub valid_hierarchy: bool,
}

impl HeadingSummary {
    pub fn from_headings(headings: &[Heading]) -> Self {
        let h1_count = headings.iter().filter(|h| h.level == 1).count();
        let skipped_levels: Vec<(u8, u8)> = headings
            .windows(2)
            .filter(|pair| pair[1].level > pair[0].level + 1)
            .map(|pair| (pair[0].level, pair[1].level))
            .collect();

        Self {
            has_h1: h1_count > 0,
            h1_count,
            multiple_h1: h1_count > 1,
            valid_hierarchy: h1_count == 1 && skipped_levels.is_empty(),
            skipped_levels,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

impl Image {
    pub fn has_alt(&self) -> bool {
        self.alt.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

/// Social and canonical metadata from `<head>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    /// `og:*` properties keyed without the prefix.
    pub open_graph: BTreeMap<String, String>,
    /// `twitter:*` names keyed without the prefix.
    pub twitter: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Structured data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredData {
    /// Every JSON-LD object found, arrays and `@graph` flattened.
    pub json_ld: Vec<Value>,
    /// Microdata items converted to JSON-LD-like objects.
    pub microdata: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Value>,
    pub product_validation: ProductValidation,
    pub offers: Vec<Offer>,
    pub reviews: ReviewSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

impl StructuredData {
    /// A Product field, if present and truthy.
    pub fn product_field(&self, field: &str) -> Option<&Value> {
        self.product
            .as_ref()
            .and_then(|p| p.get(field))
            .filter(|v| is_truthy(v))
    }

    /// A Product field as trimmed text, if it is a non-empty string.
    pub fn product_text(&self, field: &str) -> Option<&str> {
        self.product_field(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Completeness of the resolved Product object over [`PRODUCT_FIELDS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductValidation {
    pub present: bool,
    /// Present fields / total fields, 0.0 to 1.0.
    pub completeness: f64,
    pub missing_fields: Vec<String>,
    /// Number of checked fields that are present.
    pub field_count: usize,
}

impl Default for ProductValidation {
    fn default() -> Self {
        Self::absent()
    }
}

impl ProductValidation {
    /// Validation for a page with no Product object.
    pub fn absent() -> Self {
        Self {
            present: false,
            completeness: 0.0,
            missing_fields: PRODUCT_FIELDS.iter().map(|f| f.to_string()).collect(),
            field_count: 0,
        }
    }

    pub fn of(product: &Value) -> Self {
        let missing_fields: Vec<String> = PRODUCT_FIELDS
            .iter()
            .filter(|f| !product.get(**f).is_some_and(is_truthy))
            .map(|f| f.to_string())
            .collect();
        let present = PRODUCT_FIELDS.len() - missing_fields.len();

        Self {
            present: true,
            completeness: present as f64 / PRODUCT_FIELDS.len() as f64,
            missing_fields,
            field_count: present,
        }
    }

    pub fn is_missing(&self, field: &str) -> bool {
        self.missing_fields.iter().any(|f| f == field)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Offer {
    pub fn has_price_and_currency(&self) -> bool {
        self.price.as_deref().is_some_and(|p| !p.is_empty())
            && self.price_currency.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub has_reviews: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u64>,
}

/// JSON truthiness: null, false, 0, "" and empty containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn heading(level: u8) -> Heading {
        Heading {
            level,
            text: format!("h{level}"),
        }
    }

    #[test]
    fn heading_summary_single_h1() {
        let summary = HeadingSummary::from_headings(&[heading(1), heading(2), heading(3)]);
        assert!(summary.has_h1);
        assert!(!summary.multiple_h1);
        assert!(summary.valid_hierarchy);
        assert!(summary.skipped_levels.is_empty());
    }

    #[test]
    fn heading_summary_detects_skips_and_duplicates() {
        let summary =
            HeadingSummary::from_headings(&[heading(1), heading(3), heading(1), heading(2)]);
        assert_eq!(summary.h1_count, 2);
        assert!(summary.multiple_h1);
        assert_eq!(summary.skipped_levels, vec![(1, 3)]);
        assert!(!summary.valid_hierarchy);
    }

    #[test]
    fn heading_summary_empty() {
        let summary = HeadingSummary::from_headings(&[]);
        assert!(!summary.has_h1);
        assert_eq!(summary.h1_count, 0);
        assert!(!summary.valid_hierarchy);
    }

    #[test]
    fn product_validation_counts_truthy_fields() {
        let product = json!({
            "@type": "Product",
            "name": "Trail Shoe",
            "description": "",
            "brand": {"name": "Acme"},
            "offers": [],
            "sku": "TS-1"
        });
        let validation = ProductValidation::of(&product);
        assert!(validation.present);
        assert!((validation.completeness - 0.3).abs() < 1e-9);
        assert!(validation.is_missing("description"));
        assert!(validation.is_missing("offers"));
        assert!(!validation.is_missing("sku"));
        assert_eq!(validation.field_count, 3);
    }

    #[test]
    fn absent_product_is_missing_everything() {
        let validation = ProductValidation::absent();
        assert!(!validation.present);
        assert_eq!(validation.completeness, 0.0);
        assert_eq!(validation.missing_fields.len(), PRODUCT_FIELDS.len());
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([1])));
    }

    #[test]
    fn offer_price_and_currency() {
        let offer = Offer {
            price: Some("19.99".into()),
            price_currency: Some("USD".into()),
            ..Default::default()
        };
        assert!(offer.has_price_and_currency());
        assert!(!Offer::default().has_price_and_currency());
    }
}
