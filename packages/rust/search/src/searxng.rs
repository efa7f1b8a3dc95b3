//! SearXNG metasearch backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

use webcontext_shared::{Result, SearchProviderConfig, WebContextError};

use crate::{RawSearchResult, SearchProvider, SearchResponse, build_client};

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Option<Vec<SearxngItem>>,
}

#[derive(Debug, Deserialize)]
struct SearxngItem {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Search backend for a SearXNG instance's JSON API.
///
/// Result snippets are deliberately not passed as inline text; they are too
/// short to ground an answer, so every hit is fetched.
pub struct SearxngProvider {
    client: Client,
    endpoint: String,
}

impl SearxngProvider {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(WebContextError::config(
                "searxng base_url must not be empty",
            ));
        }

        let endpoint = if base.ends_with("/search") {
            base.to_string()
        } else {
            format!("{base}/search")
        };

        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint,
        })
    }

    pub fn from_config(config: &SearchProviderConfig) -> Result<Self> {
        Self::new(&config.base_url, config.timeout_secs)
    }
}

#[async_trait]
impl SearchProvider for SearxngProvider {
    fn name(&self) -> &str {
        "SearXNG"
    }

    #[instrument(skip_all, fields(query = %query))]
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .query(&[("q", query), ("format", "json"), ("safesearch", "0")])
            .send()
            .await
            .map_err(|e| WebContextError::Search(format!("searxng request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebContextError::Search(format!("searxng: HTTP {status}")));
        }

        let body: SearxngResponse = response
            .json()
            .await
            .map_err(|e| WebContextError::Search(format!("failed to parse searxng JSON: {e}")))?;

        let organic_results: Vec<RawSearchResult> = body
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|item| RawSearchResult {
                link: item.url.unwrap_or_default(),
                title: item.title,
                ..Default::default()
            })
            .collect();

        info!(results = organic_results.len(), "searxng search complete");

        Ok(SearchResponse { organic_results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn endpoint_appends_search_path() {
        let p = SearxngProvider::new("http://127.0.0.1:8888/", 5).unwrap();
        assert_eq!(p.endpoint, "http://127.0.0.1:8888/search");

        let p = SearxngProvider::new("http://127.0.0.1:8888/search", 5).unwrap();
        assert_eq!(p.endpoint, "http://127.0.0.1:8888/search");
    }

    #[tokio::test]
    async fn search_maps_results_in_order() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "results": [
                { "url": "https://en.wikipedia.org/wiki/Paris", "title": "Paris", "content": "Paris is..." },
                { "title": "no url" },
                { "url": "https://www.britannica.com/place/Paris", "title": "Paris | Britannica" },
            ]
        });

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "capital of France"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let provider = SearxngProvider::new(&server.uri(), 5).unwrap();
        let resp = provider.search("capital of France").await.unwrap();

        assert_eq!(resp.organic_results.len(), 3);
        assert_eq!(resp.organic_results[0].link, "https://en.wikipedia.org/wiki/Paris");
        assert!(resp.organic_results[0].text.is_none());
        // Missing URL survives here and is dropped by the result filter.
        assert!(resp.organic_results[1].link.is_empty());
    }

    #[tokio::test]
    async fn missing_results_key_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let provider = SearxngProvider::new(&server.uri(), 5).unwrap();
        let resp = provider.search("q").await.unwrap();
        assert!(resp.organic_results.is_empty());
    }
}
