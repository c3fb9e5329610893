use crate::templates::{self, COMMAND, ERROR, LANGUAGE, LANGUAGE_CODE};
use anyhow::{bail, Context, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub bot: BotConfig,
    pub languages: LanguagesConfig,
    pub openai: OpenAiConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Command word, without the leading `!`
    pub command: String,
    /// Max translations per user per window; 0 disables rate limiting
    pub rate_limit: usize,
    pub rate_window: Duration,
    pub messages: Messages,
}

/// Reply templates, one per situation the bot can answer with.
#[derive(Debug, Clone)]
pub struct Messages {
    /// Empty means rate-limited requests are dropped silently
    pub rate_message: String,
    pub empty_message: String,
    pub unknown_message: String,
    pub usage_message: String,
    pub auth_message: String,
    pub bot_rate_message: String,
    pub network_message: String,
    pub unexpected_message: String,
}

/// Key identifying one of the reply templates in [`Messages`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    Rate,
    Empty,
    Unknown,
    Usage,
    Auth,
    BotRate,
    Network,
    Unexpected,
}

impl MessageKey {
    pub const ALL: [MessageKey; 8] = [
        MessageKey::Rate,
        MessageKey::Empty,
        MessageKey::Unknown,
        MessageKey::Usage,
        MessageKey::Auth,
        MessageKey::BotRate,
        MessageKey::Network,
        MessageKey::Unexpected,
    ];

    /// Configuration name of the template (e.g. "auth_message")
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::Rate => "rate_message",
            MessageKey::Empty => "empty_message",
            MessageKey::Unknown => "unknown_message",
            MessageKey::Usage => "usage_message",
            MessageKey::Auth => "auth_message",
            MessageKey::BotRate => "bot_rate_message",
            MessageKey::Network => "network_message",
            MessageKey::Unexpected => "unexpected_message",
        }
    }

    /// Placeholders the template for this key may reference
    pub fn allowed_placeholders(self) -> &'static [&'static str] {
        match self {
            MessageKey::Rate | MessageKey::Empty | MessageKey::Unknown => &[LANGUAGE_CODE],
            MessageKey::Usage => &[COMMAND],
            MessageKey::Auth
            | MessageKey::BotRate
            | MessageKey::Network
            | MessageKey::Unexpected => &[ERROR, LANGUAGE_CODE],
        }
    }

    fn env_var(self) -> String {
        format!("BOT_{}", self.as_str().to_uppercase())
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Messages {
    pub fn get(&self, key: MessageKey) -> &str {
        match key {
            MessageKey::Rate => &self.rate_message,
            MessageKey::Empty => &self.empty_message,
            MessageKey::Unknown => &self.unknown_message,
            MessageKey::Usage => &self.usage_message,
            MessageKey::Auth => &self.auth_message,
            MessageKey::BotRate => &self.bot_rate_message,
            MessageKey::Network => &self.network_message,
            MessageKey::Unexpected => &self.unexpected_message,
        }
    }

    fn get_mut(&mut self, key: MessageKey) -> &mut String {
        match key {
            MessageKey::Rate => &mut self.rate_message,
            MessageKey::Empty => &mut self.empty_message,
            MessageKey::Unknown => &mut self.unknown_message,
            MessageKey::Usage => &mut self.usage_message,
            MessageKey::Auth => &mut self.auth_message,
            MessageKey::BotRate => &mut self.bot_rate_message,
            MessageKey::Network => &mut self.network_message,
            MessageKey::Unexpected => &mut self.unexpected_message,
        }
    }

    /// Check every template against the placeholders allowed for it
    pub fn validate(&self) -> Result<()> {
        for key in MessageKey::ALL {
            templates::validate(key.as_str(), self.get(key), key.allowed_placeholders())?;
        }
        Ok(())
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            rate_message: "You have reached the translation limit, please try again later."
                .to_string(),
            empty_message: "Nothing to translate! Write a message after the language code \
                            `{language_code}` or use the command as a reply to a message."
                .to_string(),
            unknown_message: "Unknown language code `{language_code}`.".to_string(),
            usage_message: "Usage: !{command} <language_code> <message>, or reply to a \
                            message with !{command} <language_code>"
                .to_string(),
            auth_message: "Translation failed, the API credentials were rejected: {error}"
                .to_string(),
            bot_rate_message: "The translation service is busy right now, please try again \
                               in a moment."
                .to_string(),
            network_message: "Could not reach the translation service, please try again later."
                .to_string(),
            unexpected_message: "Failed to translate the message: {error}".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LanguagesConfig {
    /// Use only `codes`, discarding the built-in languages
    pub replace_list: bool,
    /// Instance language codes and descriptions, in configuration order
    pub codes: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// System prompt with a `{language}` placeholder
    pub prompt: String,
    /// Alternative chat completions URL; `None` uses the OpenAI endpoint
    pub custom_endpoint: Option<String>,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn endpoint(&self) -> &str {
        self.custom_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_ENDPOINT)
    }
}

// Manual impl so the API key never ends up in logs
impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("prompt", &self.prompt)
            .field("custom_endpoint", &self.custom_endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone)]
pub struct TelegramConfig {
    /// Empty when the bot runs without the Telegram adapter
    pub bot_token: String,
    pub webhook_secret: String,
    pub api_url: String,
    pub port: u16,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("port", &self.port)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        // Load .env file (ignored when absent)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut messages = Messages::default();
        for key in MessageKey::ALL {
            // Set-but-empty is meaningful for templates (e.g. silent rate limiting)
            if let Some(value) = lookup(&key.env_var()) {
                *messages.get_mut(key) = value;
            }
        }

        let config = Self {
            bot: BotConfig {
                command: var("BOT_COMMAND")
                    .map(|c| c.trim().trim_start_matches('!').to_string())
                    .unwrap_or_else(|| "tr".to_string()),
                rate_limit: parse_or("BOT_RATE_LIMIT", var("BOT_RATE_LIMIT"), 0)?,
                rate_window: Duration::from_secs(parse_or(
                    "BOT_RATE_WINDOW",
                    var("BOT_RATE_WINDOW"),
                    3600,
                )?),
                messages,
            },
            languages: LanguagesConfig {
                replace_list: parse_bool_or(
                    "LANGUAGES_REPLACE_LIST",
                    var("LANGUAGES_REPLACE_LIST"),
                    false,
                )?,
                codes: match var("LANGUAGES_CODES") {
                    Some(raw) => parse_language_codes(&raw)?,
                    None => Vec::new(),
                },
            },
            openai: OpenAiConfig {
                api_key: var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
                model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
                max_tokens: parse_or("OPENAI_MAX_TOKENS", var("OPENAI_MAX_TOKENS"), 2048)?,
                temperature: parse_or("OPENAI_TEMPERATURE", var("OPENAI_TEMPERATURE"), 0.4)?,
                prompt: var("OPENAI_PROMPT").unwrap_or_else(|| {
                    "Translate the following message to {language}. \
                     Write nothing except the translation."
                        .to_string()
                }),
                custom_endpoint: var("OPENAI_CUSTOM_ENDPOINT").map(|e| e.trim().to_string()),
                timeout: Duration::from_secs(parse_or(
                    "OPENAI_TIMEOUT_SECS",
                    var("OPENAI_TIMEOUT_SECS"),
                    60,
                )?),
            },
            telegram: TelegramConfig {
                bot_token: var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
                webhook_secret: var("TELEGRAM_WEBHOOK_SECRET").unwrap_or_default(),
                api_url: var("TELEGRAM_API_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
                port: parse_or("PORT", var("PORT"), 8080)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the bot cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.bot.command.is_empty() || self.bot.command.contains(char::is_whitespace) {
            bail!(
                "BOT_COMMAND must be a single word, got '{}'",
                self.bot.command
            );
        }
        self.bot
            .messages
            .validate()
            .context("Invalid bot message template")?;
        templates::validate("prompt", &self.openai.prompt, &[LANGUAGE])
            .context("Invalid OpenAI prompt template")?;
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            bail!(
                "OPENAI_TEMPERATURE must be between 0 and 2, got {}",
                self.openai.temperature
            );
        }
        if self.openai.max_tokens == 0 {
            bail!("OPENAI_MAX_TOKENS must be greater than 0");
        }
        Ok(())
    }
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", name, v)),
        None => Ok(default),
    }
}

fn parse_bool_or(name: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("Invalid value for {}: '{}' (expected true or false)", name, v),
        },
    }
}

/// Parse `code=Description` pairs separated by `;` or newlines
pub fn parse_language_codes(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(|c: char| c == ';' || c == '\n')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| -> Result<(String, String)> {
            let (code, description) = pair
                .split_once('=')
                .with_context(|| format!("Invalid language entry '{}': expected code=Description", pair))?;
            let (code, description) = (code.trim(), description.trim());
            if code.is_empty() || description.is_empty() {
                bail!("Invalid language entry '{}': code and description must not be empty", pair);
            }
            Ok((code.to_string(), description.to_string()))
        })
        .collect()
}
