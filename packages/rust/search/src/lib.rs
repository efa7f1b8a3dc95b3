//! Search provider abstraction and backends.
//!
//! The pipeline only needs "query in, ordered result list out". Each backend
//! maps its own response shape onto [`SearchResponse`], collapsing a missing
//! result list to an empty one so downstream filters never see a null.

mod archyve;
mod searxng;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use webcontext_shared::{
    CandidateResult, Result, SearchProviderConfig, SearchProviderKind, WebContextError,
};

pub use archyve::ArchyveProvider;
pub use searxng::SearxngProvider;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("webcontext/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Response model
// ---------------------------------------------------------------------------

/// Normalized provider response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Ranked hits. Absent in the wire payload → empty.
    #[serde(default)]
    pub organic_results: Vec<RawSearchResult>,
}

/// A single unvalidated hit as returned by a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchResult {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub browser_link: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
}

impl RawSearchResult {
    /// Validate the link and carry the optional fields over.
    pub fn into_candidate(self) -> Result<CandidateResult> {
        let mut candidate = CandidateResult::parse(&self.link)?;
        candidate.title = self.title;
        candidate.browser_link = self.browser_link;
        candidate.text = self.text;
        candidate.favicon = self.favicon;
        Ok(candidate)
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// A backend that turns a query string into ranked results.
///
/// Transport failures are returned as errors; the pipeline treats them as
/// run-level failures.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Human-readable provider name, shown in progress updates.
    fn name(&self) -> &str;

    /// Execute `query`.
    async fn search(&self, query: &str) -> Result<SearchResponse>;
}

/// Instantiate the provider selected in `[search]`.
pub fn create_provider(config: &SearchProviderConfig) -> Result<Arc<dyn SearchProvider>> {
    match config.provider {
        SearchProviderKind::Archyve => Ok(Arc::new(ArchyveProvider::from_config(config)?)),
        SearchProviderKind::Searxng => Ok(Arc::new(SearxngProvider::from_config(config)?)),
    }
}

/// Stand-in for a provider whose `[search]` section could not be turned
/// into a client. Every search fails with the original configuration error,
/// so runs that only use direct links still work.
pub struct UnconfiguredProvider {
    name: String,
    reason: String,
}

impl UnconfiguredProvider {
    pub fn new(kind: SearchProviderKind, reason: impl Into<String>) -> Self {
        Self {
            name: kind.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str) -> Result<SearchResponse> {
        Err(WebContextError::Search(format!(
            "{} is not configured: {}",
            self.name, self.reason
        )))
    }
}

/// Build a reqwest client with provider defaults.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| WebContextError::Network(format!("failed to build HTTP client: {e}")))
}
