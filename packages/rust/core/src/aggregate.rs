//! Grouping selected passages under their sources.

use webcontext_shared::{ContextEntry, ContextSource};

use crate::fetch::Page;
use crate::segment::Passage;

/// Group `selected` passages by source link.
///
/// Sources appear in the order their first selected passage was ranked, and
/// each source's entries keep ranking order. `rank_index` is the position in
/// `selected`; `passage_index` is the index into `passages`.
pub fn aggregate_context(selected: &[usize], passages: &[Passage], pages: &[Page]) -> Vec<ContextSource> {
    let mut sources: Vec<ContextSource> = Vec::new();

    for (rank_index, &passage_index) in selected.iter().enumerate() {
        let Some(passage) = passages.get(passage_index) else {
            continue;
        };
        let Some(page) = pages.get(passage.page_index) else {
            continue;
        };

        let entry = ContextEntry {
            rank_index,
            passage_index,
            text: passage.text.clone(),
        };

        match sources.iter_mut().find(|s| s.link() == page.result.link) {
            Some(source) => source.context.push(entry),
            None => sources.push(ContextSource {
                result: page.result.clone(),
                context: vec![entry],
            }),
        }
    }

    sources
}
