//! Page fetching over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use webcontext_shared::{FetchConfig, Result, WebContextError};

use crate::extract::html_to_text;

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("webcontext/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects followed per page.
const MAX_REDIRECTS: usize = 5;

/// Turns a link into readable page text.
///
/// Every failure (transport, status, timeout, extraction) is an error; the
/// pipeline decides how to absorb it.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, link: &str) -> Result<String>;
}

/// HTTP fetcher that downloads a page and extracts its text.
pub struct HttpPageFetcher {
    client: Client,
    max_body_bytes: u64,
}

impl HttpPageFetcher {
    /// Create a fetcher with the given timeout and body limit.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WebContextError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, link: &str) -> Result<String> {
        let url = Url::parse(link)
            .map_err(|e| WebContextError::parse(format!("invalid link '{link}': {e}")))?;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| WebContextError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebContextError::Network(format!("{url}: HTTP {status}")));
        }

        // Check content-length if available
        if let Some(len) = response.content_length() {
            if len > self.max_body_bytes {
                return Err(WebContextError::validation(format!(
                    "{url}: response too large ({len} bytes, max {})",
                    self.max_body_bytes
                )));
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let body = response
            .text()
            .await
            .map_err(|e| WebContextError::Network(format!("{url}: body read failed: {e}")))?;

        if body.len() as u64 > self.max_body_bytes {
            return Err(WebContextError::validation(format!(
                "{url}: response too large ({} bytes, max {})",
                body.len(),
                self.max_body_bytes
            )));
        }

        debug!(%url, bytes = body.len(), %content_type, "page downloaded");

        if content_type.starts_with("text/plain") || content_type.starts_with("text/markdown") {
            return Ok(body.trim().to_string());
        }

        html_to_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpPageFetcher {
        HttpPageFetcher::new(&FetchConfig {
            timeout_secs: 2,
            max_body_bytes: 64 * 1024,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_and_extracts_html() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/paris"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    "<html><body><nav>Menu</nav><article><p>Paris is the capital of France.</p></article></body></html>",
                    "text/html; charset=utf-8",
                ),
            )
            .mount(&server)
            .await;

        let text = fetcher()
            .fetch(&format!("{}/paris", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "Paris is the capital of France.");
    }

    #[tokio::test]
    async fn plain_text_is_returned_as_is() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/notes.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("  # not a heading, just text  \n", "text/plain"),
            )
            .mount(&server)
            .await;

        let text = fetcher()
            .fetch(&format!("{}/notes.txt", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "# not a heading, just text");
    }

    #[tokio::test]
    async fn http_error_status_fails() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn oversized_body_fails() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("x".repeat(128 * 1024)),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/big", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn slow_page_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>late</p>")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let result = fetcher().fetch(&format!("{}/slow", server.uri())).await;
        assert!(matches!(result, Err(WebContextError::Network(_))));
    }

    #[tokio::test]
    async fn malformed_link_fails_without_request() {
        let err = fetcher().fetch("not a url").await.unwrap_err();
        assert!(matches!(err, WebContextError::Parse { .. }));
    }
}
