use crate::classify::classify;
use crate::command::{parse_command, CommandError, RepliedMessage, TextSource, TranslationRequest};
use crate::config::{BotConfig, Config, MessageKey};
use crate::i18n::LanguageRegistry;
use crate::openai::OpenAiClient;
use crate::rate_limit::RateLimiter;
use crate::templates::{self, COMMAND, LANGUAGE_CODE};
use anyhow::Result;
use std::time::Instant;
use tracing::{debug, info, warn};

/// An incoming chat message, as delivered by the platform adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub event_id: String,
    pub sender: String,
    pub body: String,
    /// The message this one replies to, if any
    pub replied: Option<RepliedMessage>,
}

/// Text to send back, and the message it should reply to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub in_reply_to: String,
}

/// The translation command handler.
///
/// Holds an immutable registry and configuration snapshot plus the rate
/// limiter state; share it across tasks behind an `Arc`.
#[derive(Debug)]
pub struct TranslateBot {
    bot: BotConfig,
    registry: LanguageRegistry,
    limiter: RateLimiter,
    openai: OpenAiClient,
}

impl TranslateBot {
    pub fn new(config: &Config) -> Result<Self> {
        let registry = LanguageRegistry::with_defaults(
            config
                .languages
                .codes
                .iter()
                .map(|(code, description)| (code.as_str(), description.as_str())),
            config.languages.replace_list,
        );

        if config.languages.replace_list {
            info!("Replacing built-in language list ({} languages)", registry.len());
        } else {
            info!(
                "Merged {} custom language codes into built-in list ({} languages)",
                config.languages.codes.len(),
                registry.len()
            );
        }
        if registry.is_empty() {
            warn!("Language list is empty, every translation request will be rejected");
        }

        let limiter = RateLimiter::new(config.bot.rate_limit, config.bot.rate_window);
        if limiter.is_disabled() {
            info!("Rate limiting disabled");
        } else {
            info!(
                "Rate limit: {} translations per {:?} per user",
                config.bot.rate_limit, config.bot.rate_window
            );
        }

        let openai = OpenAiClient::new(config.openai.clone())?;

        Ok(Self::from_parts(config.bot.clone(), registry, limiter, openai))
    }

    /// Assemble a bot from already-built components
    pub fn from_parts(
        bot: BotConfig,
        registry: LanguageRegistry,
        limiter: RateLimiter,
        openai: OpenAiClient,
    ) -> Self {
        Self {
            bot,
            registry,
            limiter,
            openai,
        }
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Handle an incoming message.
    ///
    /// Returns `None` when the message is not a translation command, or when
    /// a rate-limited request is configured to be dropped silently. Every
    /// other outcome, including failures, produces exactly one reply.
    pub async fn on_command(&self, event: &CommandEvent) -> Option<Reply> {
        self.on_command_at(event, Instant::now()).await
    }

    /// Same as [`on_command`](Self::on_command) with an explicit clock for rate limiting
    pub async fn on_command_at(&self, event: &CommandEvent, now: Instant) -> Option<Reply> {
        let parsed = parse_command(
            &self.bot.command,
            &event.body,
            &event.sender,
            event.replied.as_ref(),
            &self.registry,
        )?;

        let request = match parsed {
            Ok(request) => request,
            Err(e) => {
                info!("Rejected command from {}: {}", event.sender, e);
                return Some(self.reply(&event.event_id, self.user_error_text(&e)));
            }
        };

        if !self
            .limiter
            .check_and_record(&request.requester_id, now)
            .is_allowed()
        {
            info!("Rate limited translation request from {}", request.requester_id);
            let template = self.bot.messages.get(MessageKey::Rate);
            if template.is_empty() {
                debug!("Rate message is empty, dropping request silently");
                return None;
            }
            let text =
                templates::render(template, &[(LANGUAGE_CODE, request.language_code.as_str())]);
            return Some(self.reply(&event.event_id, text));
        }

        Some(self.translate(&event.event_id, request).await)
    }

    async fn translate(&self, event_id: &str, request: TranslationRequest) -> Reply {
        info!(
            "Translating {} chars to {} ({}) for {}",
            request.source_text.chars().count(),
            request.language.description,
            request.language.code,
            request.requester_id
        );

        match self
            .openai
            .translate(&request.language, &request.source_text)
            .await
        {
            Ok(translation) => match request.source {
                TextSource::Inline => self.reply(event_id, translation),
                // Answer the original message, tagged with the target language
                TextSource::Reply { event_id: original } => self.reply(
                    &original,
                    format!("{}: {}", request.language_code.to_uppercase(), translation),
                ),
            },
            Err(e) => {
                let classification = classify(&e);
                warn!(
                    "Translation to {} failed ({}): {}",
                    request.language.code, classification.kind, e
                );

                let mut substitutions: Vec<(&str, &str)> = classification
                    .substitutions
                    .iter()
                    .map(|(key, value)| (*key, value.as_str()))
                    .collect();
                substitutions.push((LANGUAGE_CODE, request.language_code.as_str()));

                let template = self.bot.messages.get(classification.template_key);
                self.reply(event_id, templates::render(template, &substitutions))
            }
        }
    }

    fn user_error_text(&self, error: &CommandError) -> String {
        let messages = &self.bot.messages;
        match error {
            CommandError::MissingLanguage => templates::render(
                messages.get(MessageKey::Usage),
                &[(COMMAND, self.bot.command.as_str())],
            ),
            CommandError::UnknownLanguage { language_code } => templates::render(
                messages.get(MessageKey::Unknown),
                &[(LANGUAGE_CODE, language_code.as_str())],
            ),
            CommandError::EmptyInput { language_code } => templates::render(
                messages.get(MessageKey::Empty),
                &[(LANGUAGE_CODE, language_code.as_str())],
            ),
        }
    }

    fn reply(&self, in_reply_to: &str, text: String) -> Reply {
        Reply {
            text,
            in_reply_to: in_reply_to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Messages;
    use std::time::Duration;

    fn create_test_bot(rate_limit: usize, messages: Messages) -> TranslateBot {
        let config = Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("test-openai-key".to_string()),
            // Nothing is listening; these tests never reach the API
            "OPENAI_CUSTOM_ENDPOINT" => Some("http://127.0.0.1:1/v1/chat/completions".to_string()),
            _ => None,
        })
        .expect("Should load config");

        let bot = BotConfig {
            command: "tr".to_string(),
            rate_limit,
            rate_window: Duration::from_secs(60),
            messages,
        };

        TranslateBot::from_parts(
            bot,
            LanguageRegistry::with_defaults([("tlh", "Klingon")], false),
            RateLimiter::new(rate_limit, Duration::from_secs(60)),
            OpenAiClient::new(config.openai).expect("Should build client"),
        )
    }

    fn event(body: &str) -> CommandEvent {
        CommandEvent {
            event_id: "$command".to_string(),
            sender: "@alice:example.org".to_string(),
            body: body.to_string(),
            replied: None,
        }
    }

    #[tokio::test]
    async fn test_ignores_non_commands() {
        let bot = create_test_bot(0, Messages::default());
        assert!(bot.on_command(&event("hello there")).await.is_none());
        assert!(bot.on_command(&event("!help")).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_language_reply() {
        let bot = create_test_bot(0, Messages::default());

        let reply = bot.on_command(&event("!tr xx test")).await.expect("Should reply");
        assert_eq!(reply.text, "Unknown language code `xx`.");
        assert_eq!(reply.in_reply_to, "$command");
    }

    #[tokio::test]
    async fn test_empty_input_reply() {
        let bot = create_test_bot(0, Messages::default());

        let reply = bot.on_command(&event("!tr fr")).await.expect("Should reply");
        assert!(reply.text.contains("`fr`"));
        assert!(reply.text.starts_with("Nothing to translate"));
    }

    #[tokio::test]
    async fn test_missing_language_reply_is_usage() {
        let bot = create_test_bot(0, Messages::default());

        let reply = bot.on_command(&event("!tr")).await.expect("Should reply");
        assert!(reply.text.starts_with("Usage: !tr <language_code>"));
    }

    #[tokio::test]
    async fn test_custom_language_is_resolvable() {
        let bot = create_test_bot(0, Messages::default());
        assert_eq!(bot.registry().resolve("TLH").unwrap().description, "Klingon");
    }

    #[tokio::test]
    async fn test_user_errors_do_not_count_against_limit() {
        let bot = create_test_bot(1, Messages::default());

        for _ in 0..5 {
            bot.on_command(&event("!tr xx test")).await;
            bot.on_command(&event("!tr fr")).await;
        }
        assert_eq!(bot.rate_limiter().recorded("@alice:example.org"), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_reply() {
        let messages = Messages {
            rate_message: "Slow down ({language_code})".to_string(),
            ..Messages::default()
        };
        let bot = create_test_bot(1, messages);
        let now = Instant::now();

        // First request is admitted (and fails on the unreachable endpoint)
        let first = bot.on_command_at(&event("!tr fr hi"), now).await.unwrap();
        assert_ne!(first.text, "Slow down (fr)");

        let second = bot
            .on_command_at(&event("!tr fr hi"), now + Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(second.text, "Slow down (fr)");
        assert_eq!(second.in_reply_to, "$command");
    }

    #[tokio::test]
    async fn test_empty_rate_message_drops_silently() {
        let messages = Messages {
            rate_message: String::new(),
            ..Messages::default()
        };
        let bot = create_test_bot(1, messages);
        let now = Instant::now();

        assert!(bot.on_command_at(&event("!tr fr hi"), now).await.is_some());
        assert!(bot
            .on_command_at(&event("!tr fr hi"), now + Duration::from_secs(1))
            .await
            .is_none());
        assert_eq!(bot.rate_limiter().recorded("@alice:example.org"), 1);
    }

    #[tokio::test]
    async fn test_network_failure_reply() {
        let bot = create_test_bot(0, Messages::default());

        let reply = bot.on_command(&event("!tr fr hello")).await.expect("Should reply");
        assert_eq!(
            reply.text,
            "Could not reach the translation service, please try again later."
        );
        assert_eq!(reply.in_reply_to, "$command");
    }
}
