use async_trait::async_trait;
use proxybench_common::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DIRECT_BASE_URL: &str = "https://api.openai.com/v1";
pub const PROXY_BASE_URL: &str = "http://localhost:8080/v1";
/// The proxy holds the real key; callers only need to send something.
pub const PROXY_API_KEY: &str = "dummy-key";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DIRECT_TIMEOUT: Duration = Duration::from_secs(60);
/// Applied when an endpoint does not override the timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Where and how to send chat-completion requests.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    /// Base URL including the API version prefix, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// `None` falls back to [`DEFAULT_TIMEOUT`].
    pub timeout: Option<Duration>,
}

impl EndpointConfig {
    /// The upstream API, called with a real credential.
    pub fn direct(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DIRECT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Some(DIRECT_TIMEOUT),
        }
    }

    /// The local proxy, called with a placeholder credential.
    pub fn proxied() -> Self {
        Self {
            base_url: PROXY_BASE_URL.to_string(),
            api_key: PROXY_API_KEY.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// What a completed chat request reports back. The streamed body is not read.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub status: u16,
}

/// Anything that can issue one chat-completion request for a prompt.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn issue_chat_request(&self, prompt: &str) -> Result<ChatResponse>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// OpenAI-compatible chat-completion client
pub struct ChatClient {
    pub config: EndpointConfig,
    http_client: reqwest::Client,
}

impl ChatClient {
    /// Create a new client for the given endpoint
    pub fn new(config: EndpointConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| BenchError::NetworkError(e.to_string()))?;
        Ok(Self { config, http_client })
    }

    /// Build the chat-completions URL for this endpoint.
    pub fn build_completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send a streaming chat completion for `prompt` and return once the
    /// response head has arrived.
    pub async fn create_chat_completion(&self, prompt: &str) -> Result<ChatResponse> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            stream: true,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
        };

        let url = self.build_completions_url();
        tracing::debug!(%url, model = %self.config.model, "sending chat completion");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        Ok(ChatResponse { status: status.as_u16() })
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn issue_chat_request(&self, prompt: &str) -> Result<ChatResponse> {
        self.create_chat_completion(prompt).await
    }
}

fn map_send_error(err: reqwest::Error) -> BenchError {
    if err.is_timeout() {
        BenchError::Timeout(err.to_string())
    } else {
        BenchError::NetworkError(err.to_string())
    }
}

async fn parse_error_response(status: reqwest::StatusCode, response: reqwest::Response) -> BenchError {
    let error_msg = response
        .json::<ApiErrorEnvelope>()
        .await
        .map(|r| r.error.message)
        .unwrap_or_else(|_| format!("Server returned status: {}", status));

    BenchError::HttpError(status.as_u16(), error_msg)
}
