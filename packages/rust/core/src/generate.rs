//! Search query generation from the conversation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use webcontext_shared::{Message, QueryGenerationConfig, Result, Role, WebContextError};

/// Turns a conversation into a search query.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> Result<String>;
}

/// Query generator backed by an OpenAI-compatible chat completions API.
pub struct ChatQueryGenerator {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatQueryGenerator {
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| WebContextError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", endpoint.trim().trim_end_matches('/')),
            model: model.into(),
            api_key,
        })
    }

    /// Create a generator from `[query_generation]`, reading the key from
    /// its env var.
    pub fn from_config(config: &QueryGenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self::new(&config.endpoint, config.model.clone(), api_key, config.timeout_secs)
    }
}

#[async_trait]
impl QueryGenerator for ChatQueryGenerator {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": build_prompt(messages, Utc::now().date_naive()),
            "temperature": 0.1,
            "max_tokens": 64,
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| WebContextError::QueryGeneration(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebContextError::QueryGeneration(format!("HTTP {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| WebContextError::QueryGeneration(format!("invalid response: {e}")))?;

        let query = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| clean_query(&c))
            .unwrap_or_default();

        if query.is_empty() {
            return Err(WebContextError::QueryGeneration("model returned an empty query".into()));
        }

        debug!(%query, "search query generated");
        Ok(query)
    }
}

/// Build the chat messages: instructions, two worked examples, then the
/// user's questions so far with the latest one last.
fn build_prompt(messages: &[Message], today: NaiveDate) -> Vec<Value> {
    let system = format!(
        "You write web search queries. Reply with a single query that would find the answer \
         to the user's latest question, and nothing else. Today is {}.",
        today.format("%A %B %-d, %Y")
    );

    let questions: Vec<&str> = messages
        .iter()
        .filter(|m| m.from == Role::User)
        .map(|m| m.content.as_str())
        .collect();

    let latest = questions.last().copied().unwrap_or_default();
    let earlier = &questions[..questions.len().saturating_sub(1)];
    let user = if earlier.is_empty() {
        latest.to_string()
    } else {
        format!(
            "Previous questions:\n{}\n\nCurrent question: {latest}",
            earlier
                .iter()
                .map(|q| format!("- {q}"))
                .collect::<Vec<_>>()
                .join("\n")
        )
    };

    vec![
        json!({ "role": "system", "content": system }),
        json!({ "role": "user", "content": "Who is the president of France?" }),
        json!({ "role": "assistant", "content": "president of France" }),
        json!({
            "role": "user",
            "content": "Previous questions:\n- How tall is the Eiffel Tower?\n\nCurrent question: When was it built?"
        }),
        json!({ "role": "assistant", "content": "Eiffel Tower construction date" }),
        json!({ "role": "user", "content": user }),
    ]
}

/// First non-empty line, without surrounding quotes.
fn clean_query(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[test]
    fn prompt_includes_date_and_history() {
        let messages = vec![
            Message::user("How big is Paris?"),
            Message::assistant("About 105 km²."),
            Message::user("And its population?"),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let prompt = build_prompt(&messages, today);

        let system = prompt[0]["content"].as_str().unwrap();
        assert!(system.contains("Friday May 3, 2024"));

        let last = prompt.last().unwrap()["content"].as_str().unwrap();
        assert!(last.contains("- How big is Paris?"));
        assert!(last.ends_with("Current question: And its population?"));
        assert!(!last.contains("105"));
    }

    #[test]
    fn clean_query_strips_quotes_and_extra_lines() {
        assert_eq!(clean_query("\n\"capital of France\"\nextra"), "capital of France");
        assert_eq!(clean_query("   "), "");
    }

    #[tokio::test]
    async fn generates_query() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("capital of France")))
            .mount(&server)
            .await;

        let generator =
            ChatQueryGenerator::new(&format!("{}/v1/", server.uri()), "llama3.1", Some("key".into()), 5)
                .unwrap();
        let query = generator
            .generate(&[Message::user("What is the capital of France?")])
            .await
            .unwrap();
        assert_eq!(query, "capital of France");
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("  ")))
            .mount(&server)
            .await;

        let generator = ChatQueryGenerator::new(&server.uri(), "m", None, 5).unwrap();
        let err = generator.generate(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, WebContextError::QueryGeneration(_)));
    }

    #[tokio::test]
    async fn http_error_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let generator = ChatQueryGenerator::new(&server.uri(), "m", None, 5).unwrap();
        assert!(generator.generate(&[Message::user("hi")]).await.is_err());
    }
}
