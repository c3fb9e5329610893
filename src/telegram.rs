//! Telegram webhook adapter: turns updates into [`CommandEvent`]s and sends
//! the bot's replies back with `sendMessage`.

use crate::bot::{CommandEvent, Reply, TranslateBot};
use crate::command::RepliedMessage;
use crate::config::TelegramConfig;
use crate::retry::{with_retry_if, RetryConfig};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Header Telegram sets to the secret registered with `setWebhook`
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Longest `sendMessage` text, in UTF-16 code units
pub const TELEGRAM_CHAR_LIMIT: usize = 4096;

const TRUNCATION_MARKER: &str = "…";

// Telegram webhook types
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    /// Text content, falling back to a media caption
    fn body(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
    allow_sending_without_reply: bool,
}

/// Non-success answer from the Bot API
#[derive(Debug, Error)]
#[error("Telegram API error ({status}): {body}")]
pub struct TelegramApiError {
    pub status: reqwest::StatusCode,
    pub body: String,
}

/// Convert a Telegram message into a bot event; `None` for messages without text
pub fn to_command_event(message: &Message) -> Option<CommandEvent> {
    let body = message.text.as_deref()?;

    // Rate limiting is per user; channel posts have no sender, so use the chat
    let sender = message
        .from
        .as_ref()
        .map(|u| u.id)
        .unwrap_or(message.chat.id);

    let replied = message.reply_to_message.as_deref().map(|original| RepliedMessage {
        event_id: original.message_id.to_string(),
        body: original.body().unwrap_or_default().to_string(),
    });

    Some(CommandEvent {
        event_id: message.message_id.to_string(),
        sender: sender.to_string(),
        body: body.to_string(),
        replied,
    })
}

/// Constant-time comparison of the webhook secret
pub fn secret_matches(provided: &str, expected: &str) -> bool {
    if expected.is_empty() || provided.len() != expected.len() {
        return false;
    }
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Cut `text` so it fits into a single message, marking the cut
pub fn truncate_at_limit(text: &str) -> Cow<'_, str> {
    if text.encode_utf16().count() <= TELEGRAM_CHAR_LIMIT {
        return Cow::Borrowed(text);
    }

    let budget = TELEGRAM_CHAR_LIMIT - TRUNCATION_MARKER.encode_utf16().count();
    let mut used = 0;
    let end = text
        .char_indices()
        .find(|(_, c)| {
            used += c.len_utf16();
            used > budget
        })
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    Cow::Owned(format!("{}{}", &text[..end], TRUNCATION_MARKER))
}

/// Minimal Bot API client for sending replies
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

// `base_url` embeds the bot token
impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &"[REDACTED]")
            .field("retry", &self.retry)
            .finish()
    }
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/bot{}", config.api_url, config.bot_token),
            retry: RetryConfig::reply_delivery(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Send `reply` into `chat_id`, retrying transient failures
    pub async fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<()> {
        let text = truncate_at_limit(&reply.text);
        if let Cow::Owned(_) = text {
            warn!(
                "Reply to {} is too long ({} chars), truncating",
                reply.in_reply_to,
                reply.text.chars().count()
            );
        }

        let request = SendMessageRequest {
            chat_id,
            text: &text,
            reply_to_message_id: reply.in_reply_to.parse().ok(),
            allow_sending_without_reply: true,
        };
        let url = format!("{}/sendMessage", self.base_url);
        let (client, url, request) = (&self.client, url.as_str(), &request);

        with_retry_if(
            &self.retry,
            "Telegram sendMessage",
            move || async move {
                let response = client
                    .post(url)
                    .json(request)
                    .send()
                    .await
                    // The URL carries the bot token
                    .map_err(reqwest::Error::without_url)
                    .context("Failed to send request to Telegram API")?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(TelegramApiError { status, body }.into());
                }

                Ok(())
            },
            is_retryable_error,
        )
        .await
    }
}

/// Retry rate limiting, server errors and network failures; other API errors are final
fn is_retryable_error(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<TelegramApiError>() {
        Some(api_error) => {
            api_error.status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || api_error.status.is_server_error()
        }
        None => true,
    }
}

/// Run one update through the bot and deliver the reply, if any
pub async fn handle_update(bot: &TranslateBot, telegram: &TelegramClient, update: Update) -> Result<()> {
    let message = match update.message {
        Some(msg) => msg,
        None => return Ok(()), // Not a message update, ignore
    };

    let event = match to_command_event(&message) {
        Some(event) => event,
        None => return Ok(()), // No text, ignore
    };

    let reply = match bot.on_command(&event).await {
        Some(reply) => reply,
        None => return Ok(()),
    };

    debug!("Replying in chat {} to message {}", message.chat.id, reply.in_reply_to);
    telegram
        .send_reply(message.chat.id, &reply)
        .await
        .with_context(|| format!("Failed to deliver reply to chat {}", message.chat.id))
}

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<TranslateBot>,
    pub telegram: Arc<TelegramClient>,
    pub webhook_secret: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Accept an update and process it in the background so Telegram gets a prompt 200
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !secret_matches(provided, &state.webhook_secret) {
        warn!("Rejected webhook call with invalid secret token");
        return StatusCode::UNAUTHORIZED;
    }

    info!("Received update {}", update.update_id);

    tokio::spawn(async move {
        if let Err(e) = handle_update(&state.bot, &state.telegram, update).await {
            error!("Failed to handle update: {:#}", e);
        }
    });

    StatusCode::OK
}
