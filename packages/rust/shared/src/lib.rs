//! Shared types, error model, and configuration for webcontext.
//!
//! This crate is the foundation depended on by all other webcontext crates.
//! It provides:
//! - [`WebContextError`] — the unified error type
//! - Domain types ([`CandidateResult`], [`ContextSource`], [`WebSearchRun`], [`WebSearchUpdate`])
//! - Configuration ([`AppConfig`], [`WebSearchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EmbeddingEndpointConfig, EmbeddingModelConfig, FetchConfig, QueryGenerationConfig,
    SearchProviderConfig, SearchProviderKind, WebSearchConfig, WebSearchSection,
    apply_env_overrides, config_dir, config_file_path, init_config, load_config,
    load_config_from, parse_domain_list, validate_search_credentials,
};
pub use error::{Result, WebContextError};
pub use types::{
    CandidateResult, ContextEntry, ContextSource, Message, RagSettings, Role, RunId,
    WebSearchRun, WebSearchUpdate,
};
