//! Plain HTTP fetch strategy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use arrs_shared::{ArrsError, CrawlerConfig, Result};

use crate::guard::check_target;
use crate::{FetchedDocument, Fetcher};

/// Fetches a page with a single GET, following a bounded number of redirects.
pub struct HttpFetcher {
    client: Client,
    allow_private: bool,
}

impl HttpFetcher {
    pub const METHOD: &'static str = "http";

    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(browser_headers())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ArrsError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_private: config.allow_private_hosts,
        })
    }
}

/// Headers that make the request look like a desktop browser navigation.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn method(&self) -> &'static str {
        Self::METHOD
    }

    #[instrument(skip_all, fields(url = %url, method = "http"))]
    async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        let target = check_target(url, self.allow_private)?;

        debug!("fetching page");
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| ArrsError::Acquisition(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArrsError::Acquisition(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().to_string();
        let markup = response
            .text()
            .await
            .map_err(|e| ArrsError::Acquisition(format!("{url}: body read failed: {e}")))?;

        debug!(
            status = status.as_u16(),
            final_url = %final_url,
            content_length = markup.len(),
            "fetch succeeded"
        );

        Ok(FetchedDocument {
            final_url,
            markup,
            http_status: status.as_u16(),
            method: Self::METHOD.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn local_config() -> CrawlerConfig {
        CrawlerConfig {
            allow_private_hosts: true,
            timeout_secs: 5,
            ..CrawlerConfig::default()
        }
    }

    #[tokio::test]
    async fn fetches_page_with_configured_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product"))
            .and(header("user-agent", "ARRS-Bot/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Widget</h1>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&local_config()).unwrap();
        let doc = fetcher
            .fetch(&format!("{}/product", server.uri()))
            .await
            .unwrap();

        assert_eq!(doc.http_status, 200);
        assert_eq!(doc.method, "http");
        assert!(doc.markup.contains("Widget"));
        assert!(doc.final_url.ends_with("/product"));
    }

    #[tokio::test]
    async fn records_final_url_after_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&local_config()).unwrap();
        let doc = fetcher.fetch(&format!("{}/old", server.uri())).await.unwrap();
        assert!(doc.final_url.ends_with("/new"));
        assert_eq!(doc.markup, "moved");
    }

    #[tokio::test]
    async fn non_success_status_is_acquisition_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&local_config()).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert_eq!(err.kind(), arrs_shared::ErrorKind::Acquisition);
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn private_hosts_blocked_by_default() {
        let server = MockServer::start().await;
        let fetcher = HttpFetcher::new(&CrawlerConfig::default()).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(err.to_string().contains("SSRF"));
    }
}
