//! Embedding model profiles and their lookup.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use webcontext_shared::{EmbeddingModelConfig, Result, WebContextError};

use crate::endpoint::{EmbeddingEndpoint, create_endpoint};

/// A configured embedding model.
#[derive(Clone)]
pub struct EmbeddingModel {
    pub id: String,
    pub name: String,
    /// Passage length target for this model, in characters.
    pub chunk_char_length: usize,
    pub endpoint: Arc<dyn EmbeddingEndpoint>,
}

impl EmbeddingModel {
    pub fn new(
        id: impl Into<String>,
        chunk_char_length: usize,
        endpoint: Arc<dyn EmbeddingEndpoint>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            chunk_char_length,
            endpoint,
        }
    }

    pub fn from_config(config: &EmbeddingModelConfig) -> Result<Self> {
        if config.chunk_char_length == 0 {
            return Err(WebContextError::config(format!(
                "embedding model {}: chunk_char_length must be at least 1",
                config.id
            )));
        }

        Ok(Self {
            id: config.id.clone(),
            name: config.name.clone().unwrap_or_else(|| config.id.clone()),
            chunk_char_length: config.chunk_char_length,
            endpoint: create_endpoint(&config.endpoint)?,
        })
    }
}

impl fmt::Debug for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingModel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("chunk_char_length", &self.chunk_char_length)
            .finish_non_exhaustive()
    }
}

/// The set of available models plus the default.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingRegistry {
    models: Vec<EmbeddingModel>,
    default_index: Option<usize>,
}

impl EmbeddingRegistry {
    /// Build a registry. The default is `default_id` if it names a model,
    /// else the first model.
    pub fn new(models: Vec<EmbeddingModel>, default_id: Option<&str>) -> Self {
        let default_index = default_id
            .and_then(|id| models.iter().position(|m| m.id == id))
            .or(if models.is_empty() { None } else { Some(0) });

        Self {
            models,
            default_index,
        }
    }

    /// Build a registry from `[[embedding_models]]`.
    ///
    /// The first profile flagged `default = true` becomes the default. When
    /// several are flagged, the rest are ignored with a warning.
    pub fn from_config(configs: &[EmbeddingModelConfig]) -> Result<Self> {
        let models = configs
            .iter()
            .map(EmbeddingModel::from_config)
            .collect::<Result<Vec<_>>>()?;

        let flagged: Vec<&str> = configs
            .iter()
            .filter(|c| c.default)
            .map(|c| c.id.as_str())
            .collect();
        if flagged.len() > 1 {
            warn!(models = ?flagged, "several embedding models marked default, using the first");
        }

        let registry = Self::new(models, flagged.first().copied());
        if registry.is_empty() {
            warn!("no embedding models configured, every run will fail at model resolution");
        }
        Ok(registry)
    }

    /// Resolve the model for a run: an exact id match, else the default.
    pub fn resolve(&self, requested: Option<&str>) -> Result<&EmbeddingModel> {
        if let Some(id) = requested {
            if let Some(model) = self.models.iter().find(|m| m.id == id) {
                return Ok(model);
            }
            debug!(requested = id, "embedding model not configured, falling back to default");
        }

        self.default_index
            .and_then(|i| self.models.get(i))
            .ok_or_else(|| WebContextError::ModelUnavailable {
                id: requested.unwrap_or("default").to_string(),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
