//! Similarity ranking.

use async_trait::async_trait;
use tracing::{debug, instrument};

use webcontext_shared::{Result, WebContextError};

use crate::model::EmbeddingModel;

/// Ranks a corpus of passages against a query.
#[async_trait]
pub trait SimilarityRanker: Send + Sync {
    /// Indices of the `top_k` passages most similar to `query`, best first.
    /// A corpus smaller than `top_k` yields every index.
    async fn rank(
        &self,
        model: &EmbeddingModel,
        query: &str,
        corpus: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>>;
}

/// Ranker that embeds query and corpus with the model's endpoint and scores
/// passages by cosine similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingRanker;

#[async_trait]
impl SimilarityRanker for EmbeddingRanker {
    #[instrument(skip_all, fields(model = %model.id, corpus = corpus.len(), top_k = top_k))]
    async fn rank(
        &self,
        model: &EmbeddingModel,
        query: &str,
        corpus: &[String],
        top_k: usize,
    ) -> Result<Vec<usize>> {
        if corpus.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut inputs = Vec::with_capacity(corpus.len() + 1);
        inputs.push(query.to_string());
        inputs.extend(corpus.iter().cloned());

        let vectors = model.endpoint.embed(&inputs).await?;
        let Some((query_vec, passage_vecs)) = vectors.split_first() else {
            return Err(WebContextError::Embedding("endpoint returned no vectors".into()));
        };
        if passage_vecs.len() != corpus.len() {
            return Err(WebContextError::Embedding(format!(
                "expected {} passage vectors, got {}",
                corpus.len(),
                passage_vecs.len()
            )));
        }

        let scores: Vec<f32> = passage_vecs
            .iter()
            .map(|v| cosine_similarity(query_vec, v))
            .collect();

        let indices = top_k_indices(&scores, top_k);
        debug!(selected = indices.len(), "passages ranked");
        Ok(indices)
    }
}

/// Indices of the `k` highest scores, in decreasing score order.
///
/// Ties keep the lower index first. NaN scores sort last.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    // sort_by is stable, so equal scores keep ascending index order
    indices.sort_by(|&a, &b| {
        let (sa, sb) = (scores[a], scores[b]);
        match (sa.is_nan(), sb.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => sb.total_cmp(&sa),
        }
    });
    indices.truncate(k);
    indices
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a zero
/// vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::endpoint::EmbeddingEndpoint;

    /// Embeds text as (count of "paris", count of other words).
    struct KeywordEndpoint;

    #[async_trait]
    impl EmbeddingEndpoint for KeywordEndpoint {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    let hits = lower.matches("paris").count() as f32;
                    let words = lower.split_whitespace().count() as f32;
                    vec![hits, (words - hits).max(0.0)]
                })
                .collect())
        }
    }

    #[test]
    fn cosine_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn top_k_orders_by_score_with_stable_ties() {
        let scores = [0.2, 0.9, 0.5, 0.9, 0.1];
        assert_eq!(top_k_indices(&scores, 3), vec![1, 3, 2]);
    }

    #[test]
    fn top_k_larger_than_corpus_returns_all() {
        let scores = [0.3, 0.1];
        assert_eq!(top_k_indices(&scores, 8), vec![0, 1]);
    }

    #[test]
    fn top_k_puts_nan_last() {
        let scores = [f32::NAN, 0.1, 0.4];
        assert_eq!(top_k_indices(&scores, 3), vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn embedding_ranker_selects_relevant_passages() {
        let model = EmbeddingModel::new("keyword", 512, Arc::new(KeywordEndpoint));
        let corpus: Vec<String> = [
            "The weather today is mild",
            "Paris is the capital of France",
            "Lyon is a large city",
            "paris paris",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let ranked = EmbeddingRanker
            .rank(&model, "paris", &corpus, 2)
            .await
            .unwrap();

        assert_eq!(ranked, vec![3, 1]);
    }

    #[tokio::test]
    async fn embedding_ranker_empty_corpus() {
        let model = EmbeddingModel::new("keyword", 512, Arc::new(KeywordEndpoint));
        let ranked = EmbeddingRanker.rank(&model, "paris", &[], 8).await.unwrap();
        assert!(ranked.is_empty());
    }
}
