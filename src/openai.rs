use crate::config::OpenAiConfig;
use crate::i18n::LanguageEntry;
use crate::templates::{self, LANGUAGE};
use anyhow::Context;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Longest upstream error body echoed back in an error summary
const MAX_ERROR_BODY_CHARS: usize = 200;

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Error payload returned by OpenAI-compatible APIs
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Failure of a single completion call
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// No usable response: connection, timeout, or body read failure
    #[error("failed to send request to OpenAI API: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("OpenAI API error ({status}): {message}")]
    Status { status: StatusCode, message: String },

    /// A success status with a body we could not use
    #[error("failed to parse OpenAI response: {0}")]
    Malformed(String),
}

impl OpenAiError {
    /// Short, user-presentable description of the cause
    pub fn summary(&self) -> String {
        match self {
            OpenAiError::Transport(e) if e.is_timeout() => "request timed out".to_string(),
            OpenAiError::Transport(e) if e.is_connect() => "could not connect".to_string(),
            OpenAiError::Transport(e) => e.to_string(),
            OpenAiError::Status { status, message } if message.is_empty() => status.to_string(),
            OpenAiError::Status { status, message } => format!("{} ({})", message, status),
            OpenAiError::Malformed(reason) => reason.clone(),
        }
    }
}

/// Extract the service's error message from a failed response body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

/// Drop the endpoint from transport errors; their text can end up in chat replies
fn without_url(error: reqwest::Error) -> OpenAiError {
    OpenAiError::Transport(error.without_url())
}

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        self.config.endpoint()
    }

    /// Render the system prompt for `language`
    fn system_prompt(&self, language: &LanguageEntry) -> String {
        templates::render(&self.config.prompt, &[(LANGUAGE, language.description.as_str())])
    }

    fn build_request(&self, language: &LanguageEntry, source_text: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: self.system_prompt(language),
                },
                Message {
                    role: "user".to_string(),
                    content: source_text.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Translate `source_text` into `language`.
    ///
    /// Makes exactly one request and returns the first choice's content
    /// unmodified. Retrying is left to the caller.
    pub async fn translate(
        &self,
        language: &LanguageEntry,
        source_text: &str,
    ) -> Result<String, OpenAiError> {
        let request = self.build_request(language, source_text);

        debug!(
            "Requesting {} translation from {} ({} chars)",
            language.description,
            self.endpoint(),
            source_text.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(without_url)?;

        let status = response.status();
        let body = response.text().await.map_err(without_url)?;

        if !status.is_success() {
            return Err(OpenAiError::Status {
                status,
                message: error_message(&body),
            });
        }

        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| OpenAiError::Malformed(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAiError::Malformed("response contained no choices".to_string()))?
            .message
            .content
            .ok_or_else(|| OpenAiError::Malformed("first choice has no content".to_string()))
    }
}
