//! Embedding endpoints.
//!
//! Two wire formats are supported:
//! - **TEI** (Hugging Face text-embeddings-inference): `POST {url}/embed`
//!   with `{"inputs": [...]}`, answered by a bare array of vectors.
//! - **OpenAI-compatible**: `POST {url}/v1/embeddings` with
//!   `{"model", "input"}`, answered by `{"data": [{"index", "embedding"}]}`.
//!
//! Both batch their input by the configured `batch_size` and return vectors
//! in input order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use webcontext_shared::{EmbeddingEndpointConfig, Result, WebContextError};

/// User-Agent string for embedding requests.
const USER_AGENT: &str = concat!("webcontext/", env!("CARGO_PKG_VERSION"));

/// Embedding requests can be slow on CPU-only servers.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Something that turns texts into embedding vectors.
#[async_trait]
pub trait EmbeddingEndpoint: Send + Sync {
    /// Embed `texts`, returning one vector per input in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Instantiate the endpoint described by a model profile.
pub fn create_endpoint(config: &EmbeddingEndpointConfig) -> Result<Arc<dyn EmbeddingEndpoint>> {
    match config {
        EmbeddingEndpointConfig::Tei { url, batch_size } => {
            Ok(Arc::new(TeiEndpoint::new(url, *batch_size)?))
        }
        EmbeddingEndpointConfig::Openai {
            url,
            model,
            api_key_env,
            batch_size,
        } => {
            let api_key = std::env::var(api_key_env).ok().filter(|k| !k.is_empty());
            Ok(Arc::new(OpenAiEndpoint::new(url, model, api_key, *batch_size)?))
        }
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| WebContextError::Network(format!("failed to build HTTP client: {e}")))
}

fn check_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(WebContextError::config("embedding batch_size must be at least 1"));
    }
    Ok(())
}

fn check_count(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(WebContextError::Embedding(format!(
            "endpoint returned {got} vectors for {expected} inputs"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// TEI
// ---------------------------------------------------------------------------

/// Hugging Face text-embeddings-inference server.
pub struct TeiEndpoint {
    client: Client,
    url: String,
    batch_size: usize,
}

impl TeiEndpoint {
    pub fn new(base_url: &str, batch_size: usize) -> Result<Self> {
        check_batch_size(batch_size)?;
        Ok(Self {
            client: build_client()?,
            url: format!("{}/embed", base_url.trim_end_matches('/')),
            batch_size,
        })
    }
}

#[async_trait]
impl EmbeddingEndpoint for TeiEndpoint {
    #[instrument(skip_all, fields(texts = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let response = self
                .client
                .post(&self.url)
                .json(&serde_json::json!({ "inputs": batch, "truncate": true }))
                .send()
                .await
                .map_err(|e| WebContextError::Embedding(format!("TEI request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(WebContextError::Embedding(format!(
                    "TEI error {status}: {body}"
                )));
            }

            let batch_vectors: Vec<Vec<f32>> = response
                .json()
                .await
                .map_err(|e| WebContextError::Embedding(format!("invalid TEI response: {e}")))?;

            check_count(batch.len(), batch_vectors.len())?;
            vectors.extend(batch_vectors);
        }

        debug!(vectors = vectors.len(), "TEI embeddings computed");
        Ok(vectors)
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings API.
pub struct OpenAiEndpoint {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
}

impl OpenAiEndpoint {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        batch_size: usize,
    ) -> Result<Self> {
        check_batch_size(batch_size)?;
        Ok(Self {
            client: build_client()?,
            url: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
            batch_size,
        })
    }
}

#[async_trait]
impl EmbeddingEndpoint for OpenAiEndpoint {
    #[instrument(skip_all, fields(model = %self.model, texts = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let mut request = self.client.post(&self.url).json(&serde_json::json!({
                "model": self.model,
                "input": batch,
            }));
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request
                .send()
                .await
                .map_err(|e| WebContextError::Embedding(format!("embeddings request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(WebContextError::Embedding(format!(
                    "embeddings API error {status}: {body}"
                )));
            }

            let mut body: OpenAiResponse = response.json().await.map_err(|e| {
                WebContextError::Embedding(format!("invalid embeddings response: {e}"))
            })?;

            // Sort by index to ensure order matches input
            body.data.sort_by_key(|d| d.index);
            check_count(batch.len(), body.data.len())?;
            vectors.extend(body.data.into_iter().map(|d| d.embedding));
        }

        debug!(vectors = vectors.len(), "embeddings computed");
        Ok(vectors)
    }
}
