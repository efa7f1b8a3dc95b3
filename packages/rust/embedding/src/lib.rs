//! Embedding models and similarity ranking.
//!
//! A model profile ([`EmbeddingModel`]) pairs a passage length with an
//! [`EmbeddingEndpoint`] that turns text into vectors. The
//! [`SimilarityRanker`] uses the selected profile to pick the passages most
//! similar to a query.

mod endpoint;
mod model;
mod rank;

pub use endpoint::{EmbeddingEndpoint, OpenAiEndpoint, TeiEndpoint, create_endpoint};
pub use model::{EmbeddingModel, EmbeddingRegistry};
pub use rank::{EmbeddingRanker, SimilarityRanker, cosine_similarity, top_k_indices};
