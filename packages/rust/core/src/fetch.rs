//! Concurrent page retrieval.

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use webcontext_fetch::PageFetcher;
use webcontext_shared::{CandidateResult, WebSearchUpdate};

use crate::notify::UpdateSink;

/// A candidate with its resolved text. Empty text means the fetch failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub result: CandidateResult,
    pub text: String,
}

/// Resolve text for every candidate, then keep the first `max_pages`.
///
/// Candidates carrying inline text are used as-is. All others are fetched
/// concurrently; a failed fetch yields an empty page and an error event
/// instead of failing the run. Pages come back in candidate order regardless
/// of completion order.
#[instrument(skip_all, fields(candidates = candidates.len(), max_pages = max_pages))]
pub async fn fetch_pages(
    candidates: &[CandidateResult],
    fetcher: &dyn PageFetcher,
    sink: &dyn UpdateSink,
    max_pages: usize,
) -> Vec<Page> {
    let mut pages = join_all(
        candidates
            .iter()
            .map(|candidate| resolve_page(candidate, fetcher, sink)),
    )
    .await;

    let fetched = pages.iter().filter(|p| !p.text.is_empty()).count();
    debug!(fetched, total = pages.len(), "page fetch complete");

    pages.truncate(max_pages);
    pages
}

async fn resolve_page(
    candidate: &CandidateResult,
    fetcher: &dyn PageFetcher,
    sink: &dyn UpdateSink,
) -> Page {
    if let Some(text) = candidate.inline_text() {
        return Page {
            result: candidate.clone(),
            text: text.to_string(),
        };
    }

    let text = match fetcher.fetch(&candidate.link).await {
        Ok(text) => {
            sink.notify(WebSearchUpdate::update_with(
                "Browsing webpage",
                vec![candidate.display_link().to_string()],
            ));
            text
        }
        Err(e) => {
            warn!(link = %candidate.link, error = %e, "page fetch failed");
            sink.notify(WebSearchUpdate::error(
                "Failed to parse webpage",
                vec![e.to_string(), candidate.link.clone()],
            ));
            String::new()
        }
    };

    Page {
        result: candidate.clone(),
        text,
    }
}
