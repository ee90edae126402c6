//! Client for OpenAI-compatible chat and transcription endpoints.

use std::{future::Future, path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;

use crate::config::PipelineConfig;

/// Attempts per request before giving up.
pub const MAX_TRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
pub const TRANSCRIPTION_MODEL: &str = "whisper-1";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Model returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One prompt for the model. The reply must be a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    /// Overrides the configured temperature.
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Anything that turns a prompt into JSON.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, LlmError>;
}

/// Anything that turns an audio file into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, LlmError>;
}

/// Retry a request a few times.
pub async fn retry_request<T, Func, Fut>(max_tries: u32, delay: Duration, f: Func) -> Result<T, LlmError>
where
    Func: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut remaining = max_tries.max(1);
    loop {
        let result = f().await;
        remaining -= 1;
        match result {
            Ok(t) => return Ok(t),
            Err(e) if remaining == 0 => return Err(e),
            Err(e) => {
                tracing::warn!("LLM request failed, retrying: {}", e);
                sleep(delay).await;
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Pull the JSON object out of a chat completion body.
fn parse_chat_response(body: ChatResponse) -> Result<Value, LlmError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)?;
    Ok(serde_json::from_str(&content)?)
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Chat-completions client with JSON-object responses.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(config: &PipelineConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
            temperature: config.openai_temperature,
        })
    }

    async fn chat_once(&self, request: &GenerationRequest) -> Result<Value, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: request.temperature.unwrap_or(self.temperature),
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = error_for_status(response).await?;
        parse_chat_response(response.json().await?)
    }

    async fn transcribe_once(&self, audio_path: &Path) -> Result<String, LlmError> {
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let form = multipart::Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .text("response_format", "text")
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let response = error_for_status(response).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Generator for OpenAiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, LlmError> {
        retry_request(MAX_TRIES, RETRY_DELAY, || self.chat_once(&request)).await
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, LlmError> {
        retry_request(MAX_TRIES, RETRY_DELAY, || self.transcribe_once(audio_path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_parse_chat_response() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"main_topics\": [\"Cells\"]}"}}]
        }))
        .unwrap();
        let value = parse_chat_response(body).unwrap();
        assert_eq!(value["main_topics"][0], "Cells");
    }

    #[test]
    fn test_parse_chat_response_empty() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(parse_chat_response(body), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_parse_chat_response_invalid_json() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "not json"}}]
        }))
        .unwrap();
        assert!(matches!(parse_chat_response(body), Err(LlmError::InvalidJson(_))));
    }

    #[test]
    fn test_chat_request_shape() {
        let body = ChatRequest {
            model: "gpt-4",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.5,
            response_format: ResponseFormat { kind: "json_object" },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = &AtomicU32::new(0);
        let result = retry_request(3, Duration::ZERO, || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LlmError::EmptyResponse)
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), LlmError> = retry_request(3, Duration::ZERO, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::EmptyResponse)
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
