//! Search query composition.

/// Compose the provider query from domain filters and the query text.
///
/// Segments, in order: assistant-allowed domains (`site:` terms joined by
/// `OR`), the global allow-list (same form), the global block-list
/// (`-site:` terms), then the query text. Empty segments are skipped and the
/// rest joined with single spaces, so the same inputs always produce the
/// same string.
pub fn build_search_query(
    allowed_domains: &[String],
    allow_list: &[String],
    block_list: &[String],
    query_text: &str,
) -> String {
    let segments = [
        site_disjunction(allowed_domains),
        site_disjunction(allow_list),
        block_list
            .iter()
            .map(|d| format!("-site:{d}"))
            .collect::<Vec<_>>()
            .join(" "),
        query_text.trim().to_string(),
    ];

    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn site_disjunction(domains: &[String]) -> String {
    domains
        .iter()
        .map(|d| format!("site:{d}"))
        .collect::<Vec<_>>()
        .join(" OR ")
}
