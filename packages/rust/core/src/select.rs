//! Relevance selection.

use tracing::{debug, instrument};

use webcontext_embedding::{EmbeddingModel, SimilarityRanker};
use webcontext_shared::{Result, WebContextError};

use crate::segment::Passage;

/// Ask the ranker for the `top_k` passages most similar to `prompt`.
///
/// Returns passage indices best first. Indices the ranker returns out of
/// range or more than once are discarded, and the list is capped at `top_k`.
#[instrument(skip_all, fields(model = %model.id, passages = passages.len(), top_k = top_k))]
pub async fn select_passages(
    ranker: &dyn SimilarityRanker,
    model: &EmbeddingModel,
    prompt: &str,
    passages: &[Passage],
    top_k: usize,
) -> Result<Vec<usize>> {
    if top_k == 0 || passages.is_empty() {
        return Ok(Vec::new());
    }

    let corpus: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
    let ranked = ranker.rank(model, prompt, &corpus, top_k).await?;

    let mut seen = vec![false; passages.len()];
    let mut selected = Vec::with_capacity(ranked.len().min(top_k));
    for idx in ranked {
        match seen.get_mut(idx) {
            Some(flag) if !*flag => {
                *flag = true;
                selected.push(idx);
            }
            Some(_) => debug!(idx, "ranker returned duplicate index"),
            None => {
                return Err(WebContextError::Embedding(format!(
                    "ranker returned index {idx} for {} passages",
                    passages.len()
                )));
            }
        }
        if selected.len() == top_k {
            break;
        }
    }

    Ok(selected)
}
