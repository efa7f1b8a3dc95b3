//! Passage segmentation.

use crate::fetch::Page;

/// A bounded slice of page text, tagged with the page it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    /// Index of the owning page in the carried page list.
    pub page_index: usize,
    pub text: String,
}

/// Split `text` into passages of at most `max_chars` characters.
///
/// Words are packed greedily and joined by single spaces, so whitespace runs
/// collapse. A word longer than `max_chars` is cut at character boundaries.
/// At most `max_passages` are produced; the rest of the text is dropped.
pub fn chunk_text(text: &str, max_chars: usize, max_passages: usize) -> Vec<String> {
    let mut passages = Vec::new();
    if max_chars == 0 || max_passages == 0 {
        return passages;
    }

    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                passages.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                passages.push(piece.iter().collect());
            }
        } else if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            passages.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        }

        if passages.len() >= max_passages {
            passages.truncate(max_passages);
            return passages;
        }
    }

    if !current.is_empty() {
        passages.push(current);
    }
    passages
}

/// Segment every page and flatten the passages in page order.
pub fn segment_pages(pages: &[Page], max_chars: usize, max_passages_per_page: usize) -> Vec<Passage> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(page_index, page)| {
            chunk_text(&page.text, max_chars, max_passages_per_page)
                .into_iter()
                .map(move |text| Passage { page_index, text })
        })
        .collect()
}
