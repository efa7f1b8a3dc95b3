//! Core domain types for web search runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{Result, WebContextError};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for web search run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Conversation input
// ---------------------------------------------------------------------------

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One message of the conversation driving a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            from: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            from: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Assistant-level retrieval settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagSettings {
    /// Explicit links to use instead of searching. Non-empty → direct-link mode.
    #[serde(default)]
    pub allowed_links: Vec<String>,
    /// Domains the search is restricted to.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

// ---------------------------------------------------------------------------
// CandidateResult
// ---------------------------------------------------------------------------

/// One search hit or one explicitly supplied link.
///
/// Construction goes through [`CandidateResult::parse`], so `link` is always
/// a valid absolute URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    /// Absolute URL of the page.
    pub link: String,
    /// Host derived from `link` (empty for host-less URLs).
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Page body supplied inline by the provider. Empty or absent means the
    /// page has to be fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Display URL, defaults to `link`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl CandidateResult {
    /// Build a candidate from a link, rejecting anything that does not parse
    /// as an absolute URL.
    pub fn parse(link: &str) -> Result<Self> {
        let url = Url::parse(link)
            .map_err(|e| WebContextError::parse(format!("invalid result link '{link}': {e}")))?;

        Ok(Self {
            link: link.to_string(),
            hostname: url.host_str().unwrap_or_default().to_string(),
            title: None,
            text: None,
            browser_link: None,
            favicon: None,
        })
    }

    /// URL to show to the user.
    pub fn display_link(&self) -> &str {
        self.browser_link.as_deref().unwrap_or(&self.link)
    }

    /// Inline text, if the provider supplied a non-empty body.
    pub fn inline_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// ContextSource
// ---------------------------------------------------------------------------

/// A selected passage attached to its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    /// Position of this passage in the relevance ranking (0 = best).
    pub rank_index: usize,
    /// Index of the passage in the run's flat passage sequence.
    pub passage_index: usize,
    pub text: String,
}

/// Final output unit: a candidate plus the passages selected from it, in
/// selection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSource {
    #[serde(flatten)]
    pub result: CandidateResult,
    pub context: Vec<ContextEntry>,
}

impl ContextSource {
    pub fn link(&self) -> &str {
        &self.result.link
    }
}

// ---------------------------------------------------------------------------
// WebSearchRun
// ---------------------------------------------------------------------------

/// The record of one retrieval run, mutated in place by each stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchRun {
    pub id: RunId,
    /// Latest user message.
    pub prompt: String,
    /// Query sent to the provider (empty in direct-link mode).
    pub search_query: String,
    /// Filtered candidates.
    pub results: Vec<CandidateResult>,
    /// Ranked context, grouped by source.
    pub context_sources: Vec<ContextSource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Name of the search provider used.
    pub provider: String,
    /// Message of the failure that ended the run early, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebSearchRun {
    /// Start a new run record.
    pub fn new(prompt: impl Into<String>, provider: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RunId::new(),
            prompt: prompt.into(),
            search_query: String::new(),
            results: Vec::new(),
            context_sources: Vec::new(),
            created_at: now,
            updated_at: now,
            provider: provider.into(),
            error: None,
        }
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether the run produced any grounding context.
    pub fn is_grounded(&self) -> bool {
        self.error.is_none() && !self.context_sources.is_empty()
    }
}

// ---------------------------------------------------------------------------
// WebSearchUpdate
// ---------------------------------------------------------------------------

/// Progress event emitted to the notification sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType", rename_all = "camelCase")]
pub enum WebSearchUpdate {
    /// Stage transition or per-page progress.
    Update {
        message: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
    /// Per-page failure or run failure.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
    /// Final ranked context.
    Sources { sources: Vec<ContextSource> },
}

impl WebSearchUpdate {
    pub fn update(message: impl Into<String>) -> Self {
        Self::Update {
            message: message.into(),
            args: Vec::new(),
        }
    }

    pub fn update_with(message: impl Into<String>, args: Vec<String>) -> Self {
        Self::Update {
            message: message.into(),
            args,
        }
    }

    pub fn error(message: impl Into<String>, args: Vec<String>) -> Self {
        Self::Error {
            message: message.into(),
            args,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn candidate_parse_derives_hostname() {
        let c = CandidateResult::parse("https://en.wikipedia.org/wiki/Paris").unwrap();
        assert_eq!(c.hostname, "en.wikipedia.org");
        assert_eq!(c.display_link(), "https://en.wikipedia.org/wiki/Paris");
        assert!(c.inline_text().is_none());
    }

    #[test]
    fn candidate_parse_rejects_malformed_link() {
        let err = CandidateResult::parse("not a url").unwrap_err();
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn empty_inline_text_counts_as_missing() {
        let mut c = CandidateResult::parse("https://example.com/").unwrap();
        c.text = Some(String::new());
        assert!(c.inline_text().is_none());
        c.text = Some("body".into());
        assert_eq!(c.inline_text(), Some("body"));
    }

    #[test]
    fn context_source_serializes_flat() {
        let mut result = CandidateResult::parse("https://example.com/a").unwrap();
        result.browser_link = Some("https://example.com/view/a".into());
        let source = ContextSource {
            result,
            context: vec![ContextEntry {
                rank_index: 0,
                passage_index: 3,
                text: "Paris is the capital".into(),
            }],
        };

        let json = serde_json::to_value(&source).expect("serialize");
        assert_eq!(json["link"], "https://example.com/a");
        assert_eq!(json["browserLink"], "https://example.com/view/a");
        assert_eq!(json["context"][0]["rankIndex"], 0);
        assert_eq!(json["context"][0]["passageIndex"], 3);
    }

    #[test]
    fn update_serialization_is_tagged() {
        let upd = WebSearchUpdate::error("Failed to parse webpage", vec!["timeout".into()]);
        let json = serde_json::to_value(&upd).expect("serialize");
        assert_eq!(json["messageType"], "error");
        assert_eq!(json["args"][0], "timeout");

        let parsed: WebSearchUpdate = serde_json::from_value(json).expect("deserialize");
        assert!(parsed.is_error());
    }

    #[test]
    fn rag_settings_default_lists() {
        let rag: RagSettings = serde_json::from_str(r#"{"allowedDomains":["docs.rs"]}"#).unwrap();
        assert!(rag.allowed_links.is_empty());
        assert_eq!(rag.allowed_domains, vec!["docs.rs"]);
    }

    #[test]
    fn fresh_run_is_not_grounded() {
        let run = WebSearchRun::new("capital of France", "archyve");
        assert!(!run.is_grounded());
        assert!(run.search_query.is_empty());
        assert_eq!(run.created_at, run.updated_at);
    }
}
