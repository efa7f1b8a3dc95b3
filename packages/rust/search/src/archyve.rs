//! Archyve document-search backend.
//!
//! Archyve returns vector-search hits with a distance score. The query is
//! substituted into a configured URL template at the `<query>` placeholder.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use webcontext_shared::{Result, SearchProviderConfig, WebContextError};

use crate::{RawSearchResult, SearchProvider, SearchResponse, build_client};

/// Placeholder replaced by the encoded query.
const QUERY_PLACEHOLDER: &str = "<query>";

/// Hits considered before sorting by distance.
const MAX_HITS: usize = 10;

#[derive(Debug, Deserialize)]
struct ArchyveResponse {
    #[serde(default)]
    hits: Vec<ArchyveHit>,
}

#[derive(Debug, Deserialize)]
struct ArchyveHit {
    url: String,
    #[serde(default)]
    browser_url: Option<String>,
    #[serde(default)]
    distance: f64,
}

/// Search backend for an Archyve instance.
pub struct ArchyveProvider {
    client: Client,
    query_url: String,
    api_key: String,
    client_id: String,
    favicon: String,
}

impl ArchyveProvider {
    /// Create a provider from explicit credentials.
    pub fn new(
        query_url: impl Into<String>,
        api_key: impl Into<String>,
        client_id: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let query_url = query_url.into();
        if !query_url.contains(QUERY_PLACEHOLDER) {
            return Err(WebContextError::config(format!(
                "archyve query_url must contain {QUERY_PLACEHOLDER}"
            )));
        }

        let parsed = Url::parse(&query_url.replace(QUERY_PLACEHOLDER, "q"))
            .map_err(|e| WebContextError::config(format!("invalid archyve query_url: {e}")))?;
        let favicon = format!("{}/favicon.png", parsed.origin().ascii_serialization());

        Ok(Self {
            client: build_client(timeout_secs)?,
            query_url,
            api_key: api_key.into(),
            client_id: client_id.into(),
            favicon,
        })
    }

    /// Create a provider from `[search]`, reading the API key from its env var.
    pub fn from_config(config: &SearchProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        Self::new(
            config.query_url.clone(),
            api_key,
            config.client_id.clone(),
            config.timeout_secs,
        )
    }

    fn request_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.query_url.replace(QUERY_PLACEHOLDER, &encoded)
    }
}

#[async_trait]
impl SearchProvider for ArchyveProvider {
    fn name(&self) -> &str {
        "Archyve"
    }

    #[instrument(skip_all, fields(query = %query))]
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let url = self.request_url(query);
        debug!(%url, "querying archyve");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("X-Client-Id", &self.client_id)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| WebContextError::Search(format!("archyve request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebContextError::Search(format!("archyve: HTTP {status}")));
        }

        let body: ArchyveResponse = response
            .json()
            .await
            .map_err(|e| WebContextError::Search(format!("failed to parse archyve JSON: {e}")))?;

        if body.hits.is_empty() {
            return Err(WebContextError::Search(
                "archyve response doesn't contain any hits".into(),
            ));
        }

        let mut hits = body.hits;
        hits.truncate(MAX_HITS);
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let organic_results: Vec<RawSearchResult> = hits
            .into_iter()
            .map(|hit| RawSearchResult {
                link: hit.url,
                browser_link: hit.browser_url,
                favicon: Some(self.favicon.clone()),
                ..Default::default()
            })
            .collect();

        info!(results = organic_results.len(), "archyve search complete");

        Ok(SearchResponse { organic_results })
    }
}
