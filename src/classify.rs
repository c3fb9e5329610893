//! Mapping of completion failures to user-facing reply templates.

use crate::config::MessageKey;
use crate::openai::OpenAiError;
use crate::templates::ERROR;
use reqwest::StatusCode;
use std::fmt;

/// Kind of failure reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The service rejected the credential
    Authentication,
    /// The service itself is rate limiting us
    UpstreamRateLimit,
    /// No response: connection failure or timeout
    Network,
    Unexpected,
}

impl ErrorKind {
    pub fn message_key(self) -> MessageKey {
        match self {
            ErrorKind::Authentication => MessageKey::Auth,
            ErrorKind::UpstreamRateLimit => MessageKey::BotRate,
            ErrorKind::Network => MessageKey::Network,
            ErrorKind::Unexpected => MessageKey::Unexpected,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::UpstreamRateLimit => "upstream rate limit",
            ErrorKind::Network => "network",
            ErrorKind::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

/// Result of classifying a failure: which template to reply with, and what to fill in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub template_key: MessageKey,
    pub substitutions: Vec<(&'static str, String)>,
}

/// Classify a completion failure. Total: anything unrecognised is `Unexpected`.
pub fn classify(error: &OpenAiError) -> Classification {
    let kind = match error {
        OpenAiError::Status { status, .. }
            if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
        {
            ErrorKind::Authentication
        }
        OpenAiError::Status { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
            ErrorKind::UpstreamRateLimit
        }
        OpenAiError::Transport(e) if e.is_connect() || e.is_timeout() => ErrorKind::Network,
        _ => ErrorKind::Unexpected,
    };

    Classification {
        kind,
        template_key: kind.message_key(),
        substitutions: vec![(ERROR, error.summary())],
    }
}
