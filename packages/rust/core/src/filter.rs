//! Candidate selection: direct-link policy and result filtering.

use futures::future::join_all;
use tracing::debug;

use webcontext_fetch::{LocalAddressCheck, is_link_local};
use webcontext_search::RawSearchResult;
use webcontext_shared::CandidateResult;

/// Keep the caller-supplied links that pass the local-address policy.
///
/// With `enable_local_fetch` the check is skipped entirely. Otherwise every
/// link is checked concurrently and the kept set is computed once all checks
/// have finished, in input order. Unparseable links count as local.
pub async fn direct_links(
    links: &[String],
    enable_local_fetch: bool,
    check: &dyn LocalAddressCheck,
) -> Vec<RawSearchResult> {
    let kept: Vec<&String> = if enable_local_fetch {
        links.iter().collect()
    } else {
        let verdicts = join_all(links.iter().map(|link| is_link_local(check, link))).await;
        links
            .iter()
            .zip(verdicts)
            .filter_map(|(link, local)| {
                if local {
                    debug!(%link, "dropping local link");
                    None
                } else {
                    Some(link)
                }
            })
            .collect()
    };

    kept.into_iter()
        .map(|link| RawSearchResult {
            link: link.clone(),
            ..Default::default()
        })
        .collect()
}

/// Turn raw results into the capped candidate list.
///
/// Drops entries whose link does not parse, drops entries whose link
/// contains any block-listed domain as a substring, then keeps the first
/// `max_results`.
pub fn filter_results(
    raw: Vec<RawSearchResult>,
    block_list: &[String],
    max_results: usize,
) -> Vec<CandidateResult> {
    raw.into_iter()
        .filter_map(|r| match r.into_candidate() {
            Ok(c) => Some(c),
            Err(e) => {
                debug!(error = %e, "dropping malformed result");
                None
            }
        })
        .filter(|c| {
            let blocked = block_list.iter().any(|d| c.link.contains(d.as_str()));
            if blocked {
                debug!(link = %c.link, "dropping block-listed result");
            }
            !blocked
        })
        .take(max_results)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use url::Url;

    /// Treats any host starting with "10." or named "intranet" as local.
    struct PrefixCheck;

    #[async_trait]
    impl LocalAddressCheck for PrefixCheck {
        async fn is_local(&self, url: &Url) -> bool {
            let host = url.host_str().unwrap_or_default();
            host.starts_with("10.") || host == "intranet"
        }
    }

    /// Never local, but slow to answer.
    struct SlowCheck(Duration);

    #[async_trait]
    impl LocalAddressCheck for SlowCheck {
        async fn is_local(&self, _url: &Url) -> bool {
            tokio::time::sleep(self.0).await;
            false
        }
    }

    fn raw(link: &str) -> RawSearchResult {
        RawSearchResult {
            link: link.to_string(),
            ..Default::default()
        }
    }

    fn links(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn malformed_links_are_dropped() {
        let out = filter_results(
            vec![raw("not a url"), raw("https://example.com/a"), raw("")],
            &[],
            10,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].link, "https://example.com/a");
    }

    #[test]
    fn block_list_matches_substrings() {
        let block = links(&["pinterest.com", "/ads/"]);
        let out = filter_results(
            vec![
                raw("https://www.pinterest.com/pin/1"),
                raw("https://example.com/ads/banner"),
                raw("https://example.com/paris"),
            ],
            &block,
            10,
        );
        assert_eq!(out.len(), 1);
        for c in &out {
            for d in &block {
                assert!(!c.link.contains(d.as_str()));
            }
        }
    }

    #[test]
    fn results_are_capped_in_order() {
        let raws = (0..15)
            .map(|i| raw(&format!("https://example.com/{i}")))
            .collect();
        let out = filter_results(raws, &[], 10);
        assert_eq!(out.len(), 10);
        assert_eq!(out[0].link, "https://example.com/0");
        assert_eq!(out[9].link, "https://example.com/9");
    }

    #[tokio::test]
    async fn direct_links_drop_local_and_unparseable() {
        let input = links(&[
            "https://example.com/a",
            "http://10.0.0.5/doc",
            "not a url",
            "http://intranet/wiki",
            "https://example.org/b",
        ]);
        let out = direct_links(&input, false, &PrefixCheck).await;
        let kept: Vec<&str> = out.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(kept, vec!["https://example.com/a", "https://example.org/b"]);
    }

    #[tokio::test]
    async fn local_fetch_enabled_skips_check() {
        let input = links(&["http://10.0.0.5/doc", "not a url"]);
        let out = direct_links(&input, true, &PrefixCheck).await;
        assert_eq!(out.len(), 2);
        // The malformed link is still removed by the filter.
        let candidates = filter_results(out, &[], 10);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].hostname, "10.0.0.5");
    }

    #[tokio::test]
    async fn local_checks_overlap() {
        let input: Vec<String> = (0..5).map(|i| format!("https://example.com/{i}")).collect();

        let start = Instant::now();
        let out = direct_links(&input, false, &SlowCheck(Duration::from_millis(200))).await;
        let elapsed = start.elapsed();

        let kept: Vec<&str> = out.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(kept, input.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(elapsed < Duration::from_millis(600), "took {elapsed:?}");
    }
}
