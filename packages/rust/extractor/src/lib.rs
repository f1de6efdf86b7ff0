//! HTML and structured-data extraction into [`ParsedContent`].
//!
//! [`HtmlExtractor`] parses a page once with `scraper` and fills every field
//! the scoring engines read: text and word count, headings with a hierarchy
//! summary, images, links, semantic tag counts, social metadata, and the
//! schema.org bundle (Product, Organization, offers, reviews, brand).

mod html;
mod schema;

use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

use arrs_shared::{ArrsError, HeadingSummary, ParsedContent, Result};

/// Turns raw markup into the normalized record engines consume.
///
/// Extraction is CPU-bound and synchronous; callers on an async runtime
/// should run it on the blocking pool.
pub trait Extractor: Send + Sync {
    fn extract(&self, markup: &str, base_url: &str) -> Result<ParsedContent>;
}

/// `scraper`-backed extractor for HTML documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for HtmlExtractor {
    #[instrument(skip_all, fields(base_url = %base_url, bytes = markup.len()))]
    fn extract(&self, markup: &str, base_url: &str) -> Result<ParsedContent> {
        if markup.trim().is_empty() {
            return Err(ArrsError::extraction(format!("{base_url}: empty document")));
        }
        let base = Url::parse(base_url)
            .map_err(|e| ArrsError::extraction(format!("invalid base URL {base_url}: {e}")))?;

        let doc = Html::parse_document(markup);

        let text_content = html::text_content(&doc);
        let word_count = text_content.split_whitespace().count();
        let headings = html::headings(&doc);
        let heading_summary = HeadingSummary::from_headings(&headings);

        let parsed = ParsedContent {
            title: html::title(&doc),
            meta_description: html::meta_description(&doc),
            word_count,
            text_content,
            heading_summary,
            headings,
            images: html::images(&doc, &base),
            links: html::links(&doc, &base),
            semantic_elements: html::semantic_elements(&doc),
            metadata: html::page_metadata(&doc),
            structured_data: schema::structured_data(&doc),
        };

        debug!(
            word_count = parsed.word_count,
            headings = parsed.headings.len(),
            images = parsed.images.len(),
            product = parsed.structured_data.product_validation.present,
            "extraction complete"
        );

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn product_page_fixture() {
        let parsed = HtmlExtractor
            .extract(
                &load_fixture("product.html"),
                "https://shop.example.com/products/trail-runner",
            )
            .expect("extract");

        assert_eq!(parsed.title.as_deref(), Some("Trail Runner 2 | Acme Outdoor"));
        assert!(parsed.meta_description().is_some());
        assert!(parsed.heading_summary.valid_hierarchy);
        assert_eq!(parsed.images.len(), 3);
        assert!(parsed.images.iter().all(|i| i.src.starts_with("https://")));
        assert!(parsed.semantic_element_count() >= 5);
        assert!(parsed.metadata.open_graph.len() >= 3);
        assert!(parsed.metadata.canonical_url.is_some());

        let data = &parsed.structured_data;
        assert!(data.product_validation.present);
        assert_eq!(data.brand.as_deref(), Some("Acme Outdoor"));
        assert!(data.offers[0].has_price_and_currency());
        assert!(data.reviews.has_reviews);
        assert!(!parsed.text_content.contains("dataLayer"));
    }

    #[test]
    fn bare_page_fixture() {
        let parsed = HtmlExtractor
            .extract(&load_fixture("bare.html"), "http://legacy.example.com/item")
            .expect("extract");

        assert!(!parsed.heading_summary.has_h1);
        assert!(parsed.images.is_empty());
        assert!(parsed.structured_data.product.is_none());
        assert!(parsed.meta_description().is_none());
        assert_eq!(parsed.semantic_element_count(), 0);
    }

    #[test]
    fn word_count_matches_text() {
        let parsed = HtmlExtractor
            .extract("<p>one two  three</p><p>four</p>", "https://example.com/")
            .expect("extract");
        assert_eq!(parsed.word_count, 4);
    }

    #[test]
    fn empty_markup_is_extraction_error() {
        let err = HtmlExtractor.extract("   ", "https://example.com/").unwrap_err();
        assert_eq!(err.kind(), arrs_shared::ErrorKind::Extraction);
    }

    #[test]
    fn invalid_base_url_is_extraction_error() {
        let err = HtmlExtractor.extract("<p>x</p>", "not a url").unwrap_err();
        assert_eq!(err.kind(), arrs_shared::ErrorKind::Extraction);
    }
}
