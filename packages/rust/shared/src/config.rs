//! Application configuration for webcontext.
//!
//! User config lives at `~/.webcontext/webcontext.toml`.
//! Environment variables override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WebContextError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "webcontext.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".webcontext";

/// Env var holding a JSON5 array of allow-listed domains.
const ENV_ALLOWLIST: &str = "WEBSEARCH_ALLOWLIST";

/// Env var holding a JSON5 array of block-listed domains.
const ENV_BLOCKLIST: &str = "WEBSEARCH_BLOCKLIST";

/// Env var that, when set to `"true"`, allows fetching local/private links.
const ENV_ENABLE_LOCAL_FETCH: &str = "ENABLE_LOCAL_FETCH";

// ---------------------------------------------------------------------------
// Config structs (matching webcontext.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Domain lists, caps, and the local-fetch toggle.
    #[serde(default)]
    pub websearch: WebSearchSection,

    /// Search provider settings.
    #[serde(default)]
    pub search: SearchProviderConfig,

    /// Optional LLM-backed query generation.
    #[serde(default)]
    pub query_generation: QueryGenerationConfig,

    /// Page fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Embedding model profiles.
    #[serde(default = "default_embedding_models")]
    pub embedding_models: Vec<EmbeddingModelConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            websearch: WebSearchSection::default(),
            search: SearchProviderConfig::default(),
            query_generation: QueryGenerationConfig::default(),
            fetch: FetchConfig::default(),
            embedding_models: default_embedding_models(),
        }
    }
}

/// `[websearch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchSection {
    /// Domains every search is restricted to (OR-joined `site:` filters).
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Domains excluded from every search and from result links.
    #[serde(default)]
    pub blocklist: Vec<String>,

    /// Allow assistant-supplied links that resolve to local/private addresses.
    #[serde(default)]
    pub enable_local_fetch: bool,

    /// Maximum candidate results kept after filtering.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Maximum pages carried past the fetch stage.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum passages kept per page.
    #[serde(default = "default_max_passages_per_page")]
    pub max_passages_per_page: usize,

    /// Number of passages selected for the final context.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for WebSearchSection {
    fn default() -> Self {
        Self {
            allowlist: Vec::new(),
            blocklist: Vec::new(),
            enable_local_fetch: false,
            max_results: default_max_results(),
            max_pages: default_max_pages(),
            max_passages_per_page: default_max_passages_per_page(),
            top_k: default_top_k(),
        }
    }
}

fn default_max_results() -> usize {
    10
}
fn default_max_pages() -> usize {
    5
}
fn default_max_passages_per_page() -> usize {
    100
}
fn default_top_k() -> usize {
    8
}

/// Which search backend to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    /// Archyve document search (`query_url` template).
    #[default]
    Archyve,
    /// Self-hosted SearXNG instance (`base_url`).
    Searxng,
}

impl std::fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Archyve => write!(f, "archyve"),
            Self::Searxng => write!(f, "searxng"),
        }
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProviderConfig {
    /// Backend to use.
    #[serde(default)]
    pub provider: SearchProviderKind,

    /// Archyve query URL with a `<query>` placeholder.
    #[serde(default)]
    pub query_url: String,

    /// SearXNG base URL.
    #[serde(default)]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Client identifier sent as `X-Client-Id` (Archyve).
    #[serde(default)]
    pub client_id: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchProviderConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::default(),
            query_url: String::new(),
            base_url: String::new(),
            api_key_env: default_search_api_key_env(),
            client_id: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_search_api_key_env() -> String {
    "ARCHYVE_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    10
}

/// `[query_generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryGenerationConfig {
    /// Generate the search query with an LLM instead of using the prompt verbatim.
    #[serde(default)]
    pub enabled: bool,

    /// OpenAI-compatible base URL (e.g. `http://localhost:11434/v1`).
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    /// Chat model used for query generation.
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Name of the env var holding the API key. May be unset for local servers.
    #[serde(default = "default_generation_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for QueryGenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            api_key_env: default_generation_api_key_env(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_endpoint() -> String {
    "http://localhost:11434/v1".into()
}
fn default_generation_model() -> String {
    "llama3.1".into()
}
fn default_generation_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_generation_timeout_secs() -> u64 {
    30
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-page request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest response body accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_max_body_bytes() -> u64 {
    10 * 1024 * 1024
}

/// `[[embedding_models]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingModelConfig {
    /// Model identifier conversations refer to.
    pub id: String,

    /// Display name (defaults to `id`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Target passage length in characters.
    #[serde(default = "default_chunk_char_length")]
    pub chunk_char_length: usize,

    /// Used when a conversation names no model or an unknown one.
    #[serde(default)]
    pub default: bool,

    /// Where embeddings are computed.
    pub endpoint: EmbeddingEndpointConfig,
}

fn default_chunk_char_length() -> usize {
    512
}

/// Embedding endpoint, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmbeddingEndpointConfig {
    /// Hugging Face text-embeddings-inference server.
    Tei {
        url: String,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
    /// OpenAI-compatible `/v1/embeddings` API.
    Openai {
        url: String,
        model: String,
        #[serde(default = "default_embedding_api_key_env")]
        api_key_env: String,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
}

fn default_batch_size() -> usize {
    32
}
fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn default_embedding_models() -> Vec<EmbeddingModelConfig> {
    vec![EmbeddingModelConfig {
        id: "Xenova/gte-small".into(),
        name: None,
        chunk_char_length: default_chunk_char_length(),
        default: true,
        endpoint: EmbeddingEndpointConfig::Tei {
            url: "http://127.0.0.1:8080".into(),
            batch_size: default_batch_size(),
        },
    }]
}

// ---------------------------------------------------------------------------
// Runtime web search config (derived once per run)
// ---------------------------------------------------------------------------

/// Runtime configuration for a web search run, treated as immutable for the
/// run's lifetime.
#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    /// Global allow-listed domains.
    pub allow_list: Vec<String>,
    /// Global block-listed domains (also substring-matched against links).
    pub block_list: Vec<String>,
    /// Skip the local-address check on assistant-supplied links.
    pub enable_local_fetch: bool,
    /// Candidate result cap.
    pub max_results: usize,
    /// Post-fetch page cap.
    pub max_pages: usize,
    /// Per-page passage cap.
    pub max_passages_per_page: usize,
    /// Number of passages selected.
    pub top_k: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for WebSearchConfig {
    fn from(config: &AppConfig) -> Self {
        let ws = &config.websearch;
        Self {
            allow_list: ws.allowlist.clone(),
            block_list: ws.blocklist.clone(),
            enable_local_fetch: ws.enable_local_fetch,
            max_results: ws.max_results,
            max_pages: ws.max_pages,
            max_passages_per_page: ws.max_passages_per_page,
            top_k: ws.top_k,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.webcontext/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WebContextError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.webcontext/webcontext.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk and apply environment overrides.
/// Returns defaults (plus overrides) if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| WebContextError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| WebContextError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Apply `WEBSEARCH_ALLOWLIST`, `WEBSEARCH_BLOCKLIST`, and `ENABLE_LOCAL_FETCH`.
///
/// `lookup` abstracts the environment so tests don't touch process state.
pub fn apply_env_overrides(
    config: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(raw) = lookup(ENV_ALLOWLIST) {
        config.websearch.allowlist = parse_domain_list(&raw)
            .map_err(|e| WebContextError::config(format!("{ENV_ALLOWLIST}: {e}")))?;
    }
    if let Some(raw) = lookup(ENV_BLOCKLIST) {
        config.websearch.blocklist = parse_domain_list(&raw)
            .map_err(|e| WebContextError::config(format!("{ENV_BLOCKLIST}: {e}")))?;
    }
    if let Some(raw) = lookup(ENV_ENABLE_LOCAL_FETCH) {
        config.websearch.enable_local_fetch = raw.trim() == "true";
    }
    Ok(())
}

/// Parse a JSON5 array of domain strings (single quotes and trailing commas
/// allowed). Blank input means an empty list.
pub fn parse_domain_list(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let list: Vec<String> = json5::from_str(trimmed)
        .map_err(|e| WebContextError::parse(format!("expected a JSON5 string array: {e}")))?;

    Ok(list
        .into_iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WebContextError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| WebContextError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WebContextError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the search provider is configured and its API key env var is set.
pub fn validate_search_credentials(config: &AppConfig) -> Result<()> {
    let search = &config.search;
    match search.provider {
        SearchProviderKind::Archyve => {
            if search.query_url.is_empty() {
                return Err(WebContextError::config(
                    "search.query_url must be set for the archyve provider",
                ));
            }
            let var_name = &search.api_key_env;
            match std::env::var(var_name) {
                Ok(val) if !val.is_empty() => Ok(()),
                _ => Err(WebContextError::config(format!(
                    "search API key not found. Set the {var_name} environment variable."
                ))),
            }
        }
        SearchProviderKind::Searxng => {
            if search.base_url.is_empty() {
                return Err(WebContextError::config(
                    "search.base_url must be set for the searxng provider",
                ));
            }
            Ok(())
        }
    }
}
