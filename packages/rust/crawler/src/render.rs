//! Browser-rendered fetch strategy.
//!
//! Delegates to a headless-browser rendering service so pages that build
//! their markup client-side can still be analyzed. The service contract is
//! `POST {endpoint}` with `{"url": "..."}` returning
//! `{"html": "...", "final_url": "...", "status": 200}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use arrs_shared::{ArrsError, CrawlerConfig, Result};

use crate::guard::check_target;
use crate::{FetchedDocument, Fetcher};

#[derive(Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct RenderResponse {
    html: String,
    #[serde(default)]
    final_url: Option<String>,
    #[serde(default)]
    status: Option<u16>,
}

pub struct RenderFetcher {
    client: Client,
    endpoint: String,
    allow_private: bool,
}

impl RenderFetcher {
    pub const METHOD: &'static str = "rendered";

    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        // Rendered fetches get twice the plain timeout.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.saturating_mul(2)))
            .build()
            .map_err(|e| ArrsError::config(format!("failed to build render client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.render_endpoint.clone(),
            allow_private: config.allow_private_hosts,
        })
    }
}

#[async_trait]
impl Fetcher for RenderFetcher {
    fn method(&self) -> &'static str {
        Self::METHOD
    }

    #[instrument(skip_all, fields(url = %url, method = "rendered"))]
    async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        check_target(url, self.allow_private)?;

        debug!(endpoint = %self.endpoint, "requesting rendered page");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RenderRequest { url })
            .send()
            .await
            .map_err(|e| ArrsError::Acquisition(format!("{url}: render service: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArrsError::Acquisition(format!(
                "{url}: render service returned HTTP {status}"
            )));
        }

        let rendered: RenderResponse = response.json().await.map_err(|e| {
            ArrsError::Acquisition(format!("{url}: malformed render response: {e}"))
        })?;

        let http_status = rendered.status.unwrap_or(200);
        if !(200..300).contains(&http_status) {
            return Err(ArrsError::Acquisition(format!(
                "{url}: page rendered with HTTP {http_status}"
            )));
        }

        Ok(FetchedDocument {
            final_url: rendered.final_url.unwrap_or_else(|| url.to_string()),
            markup: rendered.html,
            http_status,
            method: Self::METHOD.to_string(),
        })
    }
}
