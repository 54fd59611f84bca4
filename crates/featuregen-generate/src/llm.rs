use std::time::Duration;

use featuregen_core::{FeaturegenError, LlmConfig, MAX_RETRIES_LIMIT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use featuregen_generate::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage {
///     role: Role::User,
///     content: "Here is a controller".into(),
/// };
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use featuregen_generate::llm::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// Body of a `/v1/chat/completions` request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Sampling temperature.
    pub temperature: f64,
    /// Conversation, system message first.
    pub messages: &'a [ChatMessage],
}

/// The subset of a chat completion response that is read.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Completion choices; absent when the service answered with something else.
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Generated message.
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

/// Message inside a completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    /// Generated text.
    #[serde(default)]
    pub content: Option<String>,
}

/// Outcome of interpreting a chat completion response.
///
/// # Examples
///
/// ```
/// use featuregen_generate::llm::{ChatResponse, Completion};
///
/// let ok: ChatResponse =
///     serde_json::from_str(r#"{"choices":[{"message":{"content":"Feature: x"}}]}"#).unwrap();
/// assert_eq!(Completion::from(ok), Completion::Text("Feature: x".into()));
///
/// let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
/// assert!(matches!(Completion::from(empty), Completion::Malformed(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Text content of the first choice.
    Text(String),
    /// Why the response could not be used.
    Malformed(String),
}

impl From<ChatResponse> for Completion {
    fn from(response: ChatResponse) -> Self {
        let Some(choices) = response.choices else {
            return Completion::Malformed("response has no choices array".into());
        };
        let Some(first) = choices.into_iter().next() else {
            return Completion::Malformed("response choices array is empty".into());
        };
        match first.message.and_then(|m| m.content) {
            Some(text) => Completion::Text(text),
            None => Completion::Malformed("first choice has no message content".into()),
        }
    }
}

impl Completion {
    /// Convert into the generated text, or a protocol error.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturegenError::Protocol`] for [`Completion::Malformed`].
    pub fn into_text(self) -> Result<String, FeaturegenError> {
        match self {
            Completion::Text(text) => Ok(text),
            Completion::Malformed(reason) => Err(FeaturegenError::Protocol(reason)),
        }
    }
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes the `/v1/chat/completions` endpoint:
/// OpenAI, Azure-style gateways, Ollama, vLLM, LiteLLM, etc.
///
/// # Examples
///
/// ```
/// use featuregen_core::LlmConfig;
/// use featuregen_generate::llm::LlmClient;
///
/// let client = LlmClient::new(&LlmConfig::default(), "sk-test").unwrap();
/// assert_eq!(client.model(), "gpt-4");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl LlmClient {
    /// Create a new LLM client from configuration and an API key.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturegenError::Auth`] if `api_key` is blank, or
    /// [`FeaturegenError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig, api_key: &str) -> Result<Self, FeaturegenError> {
        if api_key.trim().is_empty() {
            return Err(FeaturegenError::Auth("API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeaturegenError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
            api_key: api_key.to_string(),
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Full URL of the completions endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Send a chat completion request and return the first choice's text.
    ///
    /// One request per call; nothing is cached. Transport failures are retried
    /// up to `max_retries` times, HTTP error statuses never are.
    ///
    /// # Errors
    ///
    /// - [`FeaturegenError::Auth`] if the service answers 401 or 403.
    /// - [`FeaturegenError::Protocol`] on any other non-success status, a body
    ///   that is not JSON, a missing or empty `choices` array, or a request
    ///   that could not be sent.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, FeaturegenError> {
        let url = self.endpoint();
        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages,
        };

        let response = self.send_with_retry(&url, &body).await?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FeaturegenError::Protocol(format!("failed to read response: {e}")))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FeaturegenError::Auth(format!(
                "completion service rejected the API key ({status}): {text}"
            )));
        }
        if !status.is_success() {
            return Err(FeaturegenError::Protocol(format!(
                "LLM API error {status}: {text}"
            )));
        }

        parse_completion(&text)?.into_text()
    }

    async fn send_with_retry(
        &self,
        url: &str,
        body: &ChatRequest<'_>,
    ) -> Result<reqwest::Response, FeaturegenError> {
        let max_retries = self.config.max_retries.min(MAX_RETRIES_LIMIT);
        let mut attempt = 0u32;
        loop {
            let result = self
                .client
                .post(url)
                .bearer_auth(&self.api_key)
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < max_retries => {
                    attempt += 1;
                    tokio::time::sleep(retry_delay(attempt)).await;
                }
                Err(e) => {
                    return Err(FeaturegenError::Protocol(format!("request failed: {e}")));
                }
            }
        }
    }
}

const RETRY_BASE_DELAY_MS: u64 = 250;
const RETRY_MAX_DELAY_MS: u64 = 8_000;

/// Exponential backoff before retry number `attempt`, capped at 8 seconds.
fn retry_delay(attempt: u32) -> Duration {
    let ms = 2u64
        .checked_pow(attempt)
        .and_then(|factor| factor.checked_mul(RETRY_BASE_DELAY_MS))
        .map_or(RETRY_MAX_DELAY_MS, |ms| ms.min(RETRY_MAX_DELAY_MS));
    Duration::from_millis(ms)
}

/// Interpret a response body from the completions endpoint.
///
/// # Errors
///
/// Returns [`FeaturegenError::Protocol`] if `body` is not JSON or does not have
/// the chat completion shape.
pub fn parse_completion(body: &str) -> Result<Completion, FeaturegenError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| FeaturegenError::Protocol(format!("response is not valid JSON: {e}")))?;
    let response: ChatResponse = serde_json::from_value(value)
        .map_err(|e| FeaturegenError::Protocol(format!("unexpected response structure: {e}")))?;
    Ok(Completion::from(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: Role::System,
                content: "system".into(),
            },
            ChatMessage {
                role: Role::User,
                content: "user".into(),
            },
        ]
    }

    fn client_for(server: &MockServer) -> LlmClient {
        let config = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        LlmClient::new(&config, "sk-test").unwrap()
    }

    #[test]
    fn blank_key_is_rejected() {
        let result = LlmClient::new(&LlmConfig::default(), " ");
        assert!(matches!(result, Err(FeaturegenError::Auth(_))));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = LlmConfig {
            base_url: "http://localhost:1234/".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config, "k").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn request_serializes_expected_fields() {
        let msgs = messages();
        let req = ChatRequest {
            model: "gpt-4",
            temperature: 0.3,
            messages: &msgs,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["temperature"], 0.3);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "user");
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn parse_missing_choices_is_malformed() {
        let completion = parse_completion(r#"{"error":{"message":"quota"}}"#).unwrap();
        assert!(matches!(completion, Completion::Malformed(_)));
        assert!(matches!(
            completion.into_text(),
            Err(FeaturegenError::Protocol(_))
        ));
    }

    #[test]
    fn parse_empty_choices_is_malformed() {
        let completion = parse_completion(r#"{"choices":[]}"#).unwrap();
        assert_eq!(
            completion,
            Completion::Malformed("response choices array is empty".into())
        );
    }

    #[test]
    fn parse_missing_content_is_malformed() {
        let completion = parse_completion(r#"{"choices":[{"message":{}}]}"#).unwrap();
        assert!(matches!(completion, Completion::Malformed(_)));
    }

    #[test]
    fn parse_invalid_json_is_protocol_error() {
        let err = parse_completion("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, FeaturegenError::Protocol(_)));
    }

    #[test]
    fn parse_non_string_content_is_protocol_error() {
        let err = parse_completion(r#"{"choices":[{"message":{"content":42}}]}"#).unwrap_err();
        assert!(matches!(err, FeaturegenError::Protocol(_)));
    }

    #[tokio::test]
    async fn chat_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4",
                "temperature": 0.3,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "Feature: first"}},
                    {"message": {"role": "assistant", "content": "Feature: second"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).chat(&messages()).await.unwrap();
        assert_eq!(text, "Feature: first");
    }

    #[tokio::test]
    async fn chat_unauthorized_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).chat(&messages()).await.unwrap_err();
        assert!(matches!(err, FeaturegenError::Auth(_)), "got {err}");
    }

    #[tokio::test]
    async fn chat_forbidden_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("model access denied"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).chat(&messages()).await.unwrap_err();
        assert!(matches!(err, FeaturegenError::Auth(_)), "got {err}");
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn retry_delay_grows_then_caps() {
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(2), Duration::from_millis(1_000));
        assert_eq!(retry_delay(5), Duration::from_millis(8_000));
        assert_eq!(retry_delay(64), Duration::from_millis(8_000));
        assert_eq!(retry_delay(u32::MAX), Duration::from_millis(8_000));
    }

    #[tokio::test]
    async fn chat_server_error_is_protocol_error_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: server.uri(),
            max_retries: 3,
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config, "sk-test").unwrap();
        let err = client.chat(&messages()).await.unwrap_err();
        assert!(matches!(err, FeaturegenError::Protocol(_)), "got {err}");
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn chat_success_without_choices_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "chat.completion"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).chat(&messages()).await.unwrap_err();
        assert!(matches!(err, FeaturegenError::Protocol(_)), "got {err}");
    }

    #[tokio::test]
    async fn identical_requests_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "Feature: x"}}]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.chat(&messages()).await.unwrap();
        client.chat(&messages()).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_service_is_protocol_error() {
        let config = LlmConfig {
            // Reserved port that nothing listens on.
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config, "sk-test").unwrap();
        let err = client.chat(&messages()).await.unwrap_err();
        assert!(matches!(err, FeaturegenError::Protocol(_)), "got {err}");
    }
}
