//! LLM client: every call to the hosted model goes through here.
//!
//! Services depend on the `TextGenerator` trait rather than on `LlmClient`,
//! so tests can substitute a canned generator.
//!
//! Calls retry on rate limits, server errors and transport failures with
//! exponential backoff; other API errors fail at once.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM output is not valid JSON: {0}")]
    Malformed(String),
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    fn into_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Result of a single round trip to the API.
enum Attempt {
    Done(MessagesResponse),
    Retry(LlmError),
    Fail(LlmError),
}

/// Rate limits and server errors are worth another try.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Pause before the `retry`-th retry: 1s, 2s, 4s, ...
fn backoff(retry: u32) -> Duration {
    Duration::from_secs(1 << retry.saturating_sub(1).min(6))
}

/// The API's own error message when the body carries one.
fn api_error_message(body: String) -> String {
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Client for the Anthropic Messages API.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, api_key })
    }

    async fn call(&self, prompt: &str, system: &str) -> Result<MessagesResponse, LlmError> {
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = backoff(attempt);
                warn!("Model call attempt {attempt} failed, retrying in {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }
            match self.send_once(&request).await {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry(e) => last_error = Some(e),
                Attempt::Fail(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or(LlmError::RetriesExhausted {
            attempts: MAX_ATTEMPTS,
        }))
    }

    async fn send_once(&self, request: &MessagesRequest<'_>) -> Attempt {
        let sent = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(e.into()),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<MessagesResponse>().await {
                Ok(parsed) => {
                    debug!(
                        "Model call ok: {} tokens in, {} out",
                        parsed.usage.input_tokens, parsed.usage.output_tokens
                    );
                    Attempt::Done(parsed)
                }
                Err(e) => Attempt::Fail(e.into()),
            };
        }

        let body = response.text().await.unwrap_or_default();
        let error = LlmError::Api {
            status: status.as_u16(),
            message: api_error_message(body),
        };
        if is_retryable(status) {
            warn!("Model API returned {status}");
            Attempt::Retry(error)
        } else {
            Attempt::Fail(error)
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        self.call(prompt, system)
            .await?
            .into_text()
            .ok_or(LlmError::EmptyContent)
    }
}

/// Best-effort JSON parse of model output: strips code fences, tries the
/// whole text, then the outermost `{...}` span.
pub fn parse_lenient_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let text = strip_json_fences(text);
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&text[start..=end])
            .map_err(|e| LlmError::Malformed(e.to_string())),
        _ => Err(LlmError::Malformed(format!(
            "no JSON object in {} chars of output",
            text.len()
        ))),
    }
}

/// Drops a surrounding Markdown code fence, with or without a `json` tag.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    let body = body.strip_prefix("json").unwrap_or(body).trim_start();
    body.strip_suffix("```").unwrap_or(body).trim()
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
    fn test_strip_json_fences_unclosed() {
        assert_eq!(strip_json_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_retry_policy() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(4));
        assert_eq!(backoff(40), Duration::from_secs(64));
    }

    #[test]
    fn test_api_error_message_prefers_api_text() {
        let body = r#"{"type": "error", "error": {"type": "invalid_request_error", "message": "max_tokens too large"}}"#;
        assert_eq!(api_error_message(body.to_string()), "max_tokens too large");
        assert_eq!(api_error_message("upstream down".to_string()), "upstream down");
    }

    #[test]
    fn test_response_text_takes_first_text_block() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content": [{"type": "thinking"}, {"type": "text", "text": "hi"}],
                "usage": {"input_tokens": 3, "output_tokens": 1}}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().as_deref(), Some("hi"));
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Rewrite {
        bullet: String,
    }

    #[test]
    fn test_parse_lenient_json_direct() {
        let parsed: Rewrite = parse_lenient_json(r#"{"bullet": "Cut p99 by 40%"}"#).unwrap();
        assert_eq!(parsed.bullet, "Cut p99 by 40%");
    }

    #[test]
    fn test_parse_lenient_json_fenced_and_chatty() {
        let parsed: Rewrite =
            parse_lenient_json("```json\n{\"bullet\": \"Shipped v2\"}\n```").unwrap();
        assert_eq!(parsed.bullet, "Shipped v2");

        let parsed: Rewrite =
            parse_lenient_json("Sure! Here it is: {\"bullet\": \"Led migration\"} Hope it helps.")
                .unwrap();
        assert_eq!(parsed.bullet, "Led migration");
    }

    #[test]
    fn test_parse_lenient_json_rejects_garbage() {
        let err = parse_lenient_json::<Rewrite>("I cannot help with that.").unwrap_err();
        assert!(matches!(err, LlmError::Malformed(_)));

        let err = parse_lenient_json::<Rewrite>("{\"other\": 1}").unwrap_err();
        assert!(matches!(err, LlmError::Malformed(_)));
    }
}
