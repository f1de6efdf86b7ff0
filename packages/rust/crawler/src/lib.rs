//! Single-page content acquisition.
//!
//! This crate provides:
//! - [`Fetcher`], the capability the orchestrator acquires markup through
//! - [`HttpFetcher`], a plain HTTP GET with browser-like headers
//! - [`RenderFetcher`], a client for a headless-browser rendering service,
//!   used as the fallback strategy for script-heavy pages
//! - [`guard`], SSRF protection shared by both

pub mod guard;
pub mod http;
pub mod render;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use arrs_shared::{AnalysisId, CrawledContent, Result};

pub use http::HttpFetcher;
pub use render::RenderFetcher;

/// Raw markup acquired for one URL.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// URL after redirects.
    pub final_url: String,
    pub markup: String,
    pub http_status: u16,
    /// Tag of the strategy that produced this document.
    pub method: String,
}

impl FetchedDocument {
    /// Attach the document to an analysis as a storable [`CrawledContent`].
    pub fn into_crawled(self, analysis_id: AnalysisId, requested_url: &str) -> CrawledContent {
        CrawledContent {
            id: Uuid::now_v7(),
            analysis_id,
            url: requested_url.to_string(),
            content_hash: compute_hash(&self.markup),
            final_url: self.final_url,
            markup: self.markup,
            http_status: self.http_status,
            method: self.method,
            crawled_at: Utc::now(),
        }
    }
}

/// A strategy that turns a URL into raw markup.
///
/// Failures surface as [`arrs_shared::ArrsError::Acquisition`]; timeouts are
/// the implementation's concern.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Method tag recorded on documents this fetcher produces.
    fn method(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> Result<FetchedDocument>;
}

/// SHA-256 hash of content, hex encoded.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawled_content_keeps_requested_and_final_url() {
        let doc = FetchedDocument {
            final_url: "https://shop.example.com/p/1".into(),
            markup: "<html></html>".into(),
            http_status: 200,
            method: "http".into(),
        };
        let id = AnalysisId::new();
        let crawled = doc.into_crawled(id, "http://shop.example.com/p/1");

        assert_eq!(crawled.analysis_id, id);
        assert_eq!(crawled.url, "http://shop.example.com/p/1");
        assert_eq!(crawled.final_url, "https://shop.example.com/p/1");
        assert_eq!(crawled.content_hash, compute_hash("<html></html>"));
        assert_eq!(crawled.content_hash.len(), 64);
    }
}
