/// LLM client: the single point of entry for every AI provider call in jobscout.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// Scoring tiers hold one `LlmClient` each; the wire format is picked by
/// `LlmProvider`, the retry/backoff schedule is injected via `RetryPolicy`.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Backing service behind a client. Groq and OpenAI share the
/// chat-completions wire format; Anthropic uses the Messages API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
    Groq,
}

impl LlmProvider {
    pub fn label(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Groq => "groq",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "claude-sonnet-4-5",
            LlmProvider::OpenAi => "gpt-4o",
            LlmProvider::Groq => "llama-3.3-70b-versatile",
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "https://api.anthropic.com/v1/messages",
            LlmProvider::OpenAi => "https://api.openai.com/v1/chat/completions",
            LlmProvider::Groq => "https://api.groq.com/openai/v1/chat/completions",
        }
    }

    /// Environment variable prefix for this provider's key and model.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC",
            LlmProvider::OpenAi => "OPENAI",
            LlmProvider::Groq => "GROQ",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            "openai" => Ok(LlmProvider::OpenAi),
            "groq" => Ok(LlmProvider::Groq),
            other => Err(format!("unknown LLM provider '{other}'")),
        }
    }
}

/// Retry schedule for 429 and 5xx responses: `max_retries` attempts in
/// total, sleeping `base_backoff * 2^(n-1)` before attempt `n`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.base_backoff * (1u32 << (attempt - 1).min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(1000),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire formats
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Provider-neutral completion.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub text: Option<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

impl From<AnthropicResponse> for LlmResponse {
    fn from(r: AnthropicResponse) -> Self {
        let text = r
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text);
        Self {
            text,
            input_tokens: r.usage.input_tokens,
            output_tokens: r.usage.output_tokens,
        }
    }
}

impl From<ChatResponse> for LlmResponse {
    fn from(r: ChatResponse) -> Self {
        let (input_tokens, output_tokens) = r
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        Self {
            text: r.choices.into_iter().next().and_then(|c| c.message.content),
            input_tokens,
            output_tokens,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// One configured provider connection with retry logic and structured
/// output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    provider: LlmProvider,
    api_key: String,
    model: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(
        provider: LlmProvider,
        api_key: String,
        model: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            provider,
            api_key,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            endpoint: provider.default_endpoint().to_string(),
            retry,
        }
    }

    /// Points the client at a different endpoint (proxies, self-hosted gateways).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw call, returning the normalized response.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let attempts = self.retry.max_retries.max(1);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_before(attempt);
                warn!(
                    "{} call attempt {} failed, retrying after {}ms...",
                    self.provider,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.send(prompt, system).await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("{} API returned {}: {}", self.provider, status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = match self.provider {
                LlmProvider::Anthropic => response.json::<AnthropicResponse>().await?.into(),
                LlmProvider::OpenAi | LlmProvider::Groq => {
                    response.json::<ChatResponse>().await?.into()
                }
            };

            debug!(
                "{} call succeeded (model {}): input_tokens={}, output_tokens={}",
                self.provider, self.model, llm_response.input_tokens, llm_response.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited { retries: attempts }))
    }

    async fn send(&self, prompt: &str, system: &str) -> Result<reqwest::Response, reqwest::Error> {
        match self.provider {
            LlmProvider::Anthropic => {
                let body = AnthropicRequest {
                    model: &self.model,
                    max_tokens: MAX_TOKENS,
                    temperature: TEMPERATURE,
                    system,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                };
                self.client
                    .post(&self.endpoint)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .header("content-type", "application/json")
                    .json(&body)
                    .send()
                    .await
            }
            LlmProvider::OpenAi | LlmProvider::Groq => {
                let body = ChatRequest {
                    model: &self.model,
                    max_tokens: MAX_TOKENS,
                    temperature: TEMPERATURE,
                    messages: vec![
                        ChatMessage {
                            role: "system",
                            content: system,
                        },
                        ChatMessage {
                            role: "user",
                            content: prompt,
                        },
                    ],
                    response_format: (self.provider == LlmProvider::OpenAi).then_some(
                        ResponseFormat {
                            kind: "json_object",
                        },
                    ),
                };
                self.client
                    .post(&self.endpoint)
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await
            }
        }
    }

    /// Calls the model and deserializes the JSON object in its reply.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        serde_json::from_str(extract_json(text)).map_err(LlmError::Parse)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Fences first, then the span from the first `{` to the last `}` so that
/// chatty preambles ("Here is the analysis: {...}") still parse.
fn extract_json(text: &str) -> &str {
    let text = strip_json_fences(text);
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_json_ignores_surrounding_prose() {
        let input = "Sure! Here is the analysis:\n{\"a\": {\"b\": 1}}\nLet me know.";
        assert_eq!(extract_json(input), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_extract_json_without_object_returns_input() {
        assert_eq!(extract_json("no json here"), "no json here");
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("Groq".parse::<LlmProvider>(), Ok(LlmProvider::Groq));
        assert_eq!(" openai ".parse::<LlmProvider>(), Ok(LlmProvider::OpenAi));
        assert_eq!("claude".parse::<LlmProvider>(), Ok(LlmProvider::Anthropic));
        assert!("gemini".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 4,
            base_backoff: Duration::from_millis(250),
        };
        assert_eq!(policy.delay_before(0), Duration::ZERO);
        assert_eq!(policy.delay_before(1), Duration::from_millis(250));
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
    }

    #[test]
    fn test_chat_response_normalizes() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{}"}}],
                      "usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#;
        let response: LlmResponse = serde_json::from_str::<ChatResponse>(raw).unwrap().into();
        assert_eq!(response.text(), Some("{}"));
        assert_eq!(response.input_tokens, 12);
        assert_eq!(response.output_tokens, 3);
    }

    #[test]
    fn test_anthropic_response_normalizes() {
        let raw = r#"{"content":[{"type":"text","text":"hello"}],
                      "usage":{"input_tokens":5,"output_tokens":1}}"#;
        let response: LlmResponse = serde_json::from_str::<AnthropicResponse>(raw).unwrap().into();
        assert_eq!(response.text(), Some("hello"));
    }

    #[test]
    fn test_blank_text_counts_as_empty() {
        let response = LlmResponse {
            text: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(response.text(), None);
    }
}
