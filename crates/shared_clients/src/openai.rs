use async_trait::async_trait;
use common::config::OpenAiConfig;
use common::error::DiagnosticMessage;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the completion length; a generated query plus parameters
/// fits comfortably.
pub const MAX_COMPLETION_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("missing credential: {context}")]
    MissingCredential { context: DiagnosticMessage },
    #[error("request failed: {context}")]
    Request { context: DiagnosticMessage },
    #[error("completion api returned {status}: {context}")]
    Status {
        status: StatusCode,
        context: DiagnosticMessage,
    },
    #[error("unreadable completion: {context}")]
    InvalidBody { context: DiagnosticMessage },
}

impl CompletionError {
    #[track_caller]
    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::MissingCredential {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::InvalidBody {
            context: DiagnosticMessage::new(message.into()),
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::request(format!("completion request timed out: {err}"))
        } else if err.is_decode() {
            CompletionError::invalid_body(err.to_string())
        } else {
            CompletionError::request(err.to_string())
        }
    }
}

/// Sends one prompt to a hosted language model and returns the raw text of
/// its answer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
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
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Chat-completions client. Temperature is pinned to 0 so the same prompt
/// keeps producing the same SQL.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(cfg: &OpenAiConfig) -> Result<Self, CompletionError> {
        if cfg.api_key.trim().is_empty() {
            return Err(CompletionError::missing_credential(
                "no OpenAI API key configured",
            ));
        }
        let http = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| CompletionError::request(format!("could not build http client: {e}")))?;

        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(CompletionError::status(status, message));
        }

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::invalid_body("response contained no completion"))?;

        let content = content.trim().to_string();
        tracing::debug!(model = %self.model, completion = %content, "received completion");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4".to_string(),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn blank_key_is_a_missing_credential() {
        let mut cfg = config("http://localhost");
        cfg.api_key = "  ".to_string();
        assert!(matches!(
            OpenAiClient::new(&cfg),
            Err(CompletionError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn test_sends_fixed_parameters_and_returns_trimmed_content(
    ) -> Result<(), CompletionError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4",
                "max_tokens": 1024,
                "temperature": 0.0,
                "messages": [{"role": "user", "content": "how many customers?"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "\n {\"sql\": \"SELECT COUNT(*) FROM customers\", \"paramValues\": []}  \n"
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server.uri()))?;
        let completion = client.complete("how many customers?").await?;

        assert_eq!(
            completion,
            "{\"sql\": \"SELECT COUNT(*) FROM customers\", \"paramValues\": []}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_error_status_surfaces_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached", "type": "requests"}
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server.uri())).unwrap();
        match client.complete("anything").await {
            Err(CompletionError::Status { status, context }) => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(context.message(), "Rate limit reached");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_choices_is_an_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server.uri())).unwrap();
        assert!(matches!(
            client.complete("anything").await,
            Err(CompletionError::InvalidBody { .. })
        ));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut cfg = config(&server.uri());
        cfg.timeout = Duration::from_millis(200);
        let client = OpenAiClient::new(&cfg).unwrap();
        assert!(matches!(
            client.complete("anything").await,
            Err(CompletionError::Request { .. })
        ));
    }
}
