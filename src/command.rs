use crate::i18n::{LanguageEntry, LanguageRegistry};
use thiserror::Error;

/// The message a command was issued in reply to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepliedMessage {
    pub event_id: String,
    pub body: String,
}

/// Where the text to translate came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    /// Typed after the language code
    Inline,
    /// Body of the message the command replied to
    Reply { event_id: String },
}

/// A fully resolved translation request, consumed once by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub requester_id: String,
    /// Language code exactly as typed by the user
    pub language_code: String,
    pub language: LanguageEntry,
    pub source_text: String,
    pub source: TextSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("no language code given")]
    MissingLanguage,

    #[error("unknown language code '{language_code}'")]
    UnknownLanguage { language_code: String },

    #[error("nothing to translate into '{language_code}'")]
    EmptyInput { language_code: String },
}

/// Return the argument text if `raw` invokes `!<command>`, `None` otherwise.
///
/// The command word must be followed by whitespace or the end of the message,
/// so `!trx` does not match `!tr`.
pub fn strip_command<'a>(command: &str, raw: &'a str) -> Option<&'a str> {
    let rest = raw.trim_start().strip_prefix('!')?.strip_prefix(command)?;

    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

/// Parse a `!<command> <language_code> [text]` message.
///
/// Returns `None` when the message is not this command. The language code is
/// resolved first; the text then comes from the inline text, else from the
/// replied message's body.
pub fn parse_command(
    command: &str,
    raw: &str,
    requester_id: &str,
    replied: Option<&RepliedMessage>,
    registry: &LanguageRegistry,
) -> Option<Result<TranslationRequest, CommandError>> {
    let args = strip_command(command, raw)?;
    Some(parse_args(args, requester_id, replied, registry))
}

fn parse_args(
    args: &str,
    requester_id: &str,
    replied: Option<&RepliedMessage>,
    registry: &LanguageRegistry,
) -> Result<TranslationRequest, CommandError> {
    let args = args.trim();
    if args.is_empty() {
        return Err(CommandError::MissingLanguage);
    }

    let (language_code, inline) = match args.split_once(char::is_whitespace) {
        Some((code, text)) => (code, text.trim()),
        None => (args, ""),
    };

    let language = registry
        .resolve(language_code)
        .cloned()
        .ok_or_else(|| CommandError::UnknownLanguage {
            language_code: language_code.to_string(),
        })?;

    let (source_text, source) = if !inline.is_empty() {
        (inline.to_string(), TextSource::Inline)
    } else {
        match replied {
            Some(reply) if !reply.body.trim().is_empty() => (
                reply.body.trim().to_string(),
                TextSource::Reply {
                    event_id: reply.event_id.clone(),
                },
            ),
            _ => {
                return Err(CommandError::EmptyInput {
                    language_code: language_code.to_string(),
                })
            }
        }
    };

    Ok(TranslationRequest {
        requester_id: requester_id.to_string(),
        language_code: language_code.to_string(),
        language,
        source_text,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LanguageRegistry {
        LanguageRegistry::build(
            [("fr", "French"), ("de", "German")],
            [("es", "Spanish")],
            false,
        )
    }

    fn parse(raw: &str, replied: Option<&RepliedMessage>) -> Option<Result<TranslationRequest, CommandError>> {
        parse_command("tr", raw, "@alice:example.org", replied, &registry())
    }

    fn reply(body: &str) -> RepliedMessage {
        RepliedMessage {
            event_id: "$original".to_string(),
            body: body.to_string(),
        }
    }

    // ==================== strip_command Tests ====================

    #[test]
    fn test_strip_command_matches() {
        assert_eq!(strip_command("tr", "!tr fr hi"), Some(" fr hi"));
        assert_eq!(strip_command("tr", "!tr"), Some(""));
        assert_eq!(strip_command("tr", "  !tr\nfr"), Some("\nfr"));
    }

    #[test]
    fn test_strip_command_rejects_other_text() {
        assert_eq!(strip_command("tr", "tr fr hi"), None);
        assert_eq!(strip_command("tr", "!translate fr"), None);
        assert_eq!(strip_command("tr", "!trfr hi"), None);
        assert_eq!(strip_command("tr", "hello !tr fr"), None);
        assert_eq!(strip_command("tr", "/tr fr"), None);
    }

    #[test]
    fn test_strip_command_custom_word() {
        assert_eq!(strip_command("translate", "!translate de x"), Some(" de x"));
        assert_eq!(strip_command("translate", "!tr de x"), None);
    }

    // ==================== parse_command Tests ====================

    #[test]
    fn test_not_a_command() {
        assert!(parse("good morning", None).is_none());
    }

    #[test]
    fn test_inline_text() {
        let request = parse("!tr fr Hello World", None).unwrap().unwrap();

        assert_eq!(request.language.code, "fr");
        assert_eq!(request.language.description, "French");
        assert_eq!(request.language_code, "fr");
        assert_eq!(request.source_text, "Hello World");
        assert_eq!(request.source, TextSource::Inline);
        assert_eq!(request.requester_id, "@alice:example.org");
    }

    #[test]
    fn test_reply_text() {
        let original = reply("Good morning");
        let request = parse("!tr de", Some(&original)).unwrap().unwrap();

        assert_eq!(request.language.code, "de");
        assert_eq!(request.source_text, "Good morning");
        assert_eq!(
            request.source,
            TextSource::Reply {
                event_id: "$original".to_string()
            }
        );
    }

    #[test]
    fn test_inline_text_wins_over_reply() {
        let original = reply("Good morning");
        let request = parse("!tr de Good night", Some(&original)).unwrap().unwrap();

        assert_eq!(request.source_text, "Good night");
        assert_eq!(request.source, TextSource::Inline);
    }

    #[test]
    fn test_reply_body_trimmed_like_inline_text() {
        let original = reply("  line one\n\tline two  \n");
        let from_reply = parse("!tr fr", Some(&original)).unwrap().unwrap();
        let inline = parse("!tr fr   line one\n\tline two  \n", None).unwrap().unwrap();

        assert_eq!(from_reply.source_text, "line one\n\tline two");
        assert_eq!(from_reply.source_text, inline.source_text);
    }

    #[test]
    fn test_multiline_inline_text() {
        let request = parse("!tr fr\nfirst line\nsecond line", None).unwrap().unwrap();
        assert_eq!(request.source_text, "first line\nsecond line");
    }

    #[test]
    fn test_language_code_case_insensitive() {
        let request = parse("!tr ES hola", None).unwrap().unwrap();
        assert_eq!(request.language.code, "es");
        assert_eq!(request.language_code, "ES");
    }

    #[test]
    fn test_unknown_language() {
        let result = parse("!tr xx test", None).unwrap();
        assert_eq!(
            result,
            Err(CommandError::UnknownLanguage {
                language_code: "xx".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_language_reports_code_as_typed() {
        let result = parse("!tr Klingon qapla", None).unwrap();
        assert_eq!(
            result,
            Err(CommandError::UnknownLanguage {
                language_code: "Klingon".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_language_checked_before_empty_input() {
        let result = parse("!tr xx", None).unwrap();
        assert!(matches!(result, Err(CommandError::UnknownLanguage { .. })));
    }

    #[test]
    fn test_empty_input_without_reply() {
        let result = parse("!tr fr", None).unwrap();
        assert_eq!(
            result,
            Err(CommandError::EmptyInput {
                language_code: "fr".to_string()
            })
        );
    }

    #[test]
    fn test_empty_input_with_blank_inline_text() {
        let result = parse("!tr fr    ", None).unwrap();
        assert!(matches!(result, Err(CommandError::EmptyInput { .. })));
    }

    #[test]
    fn test_empty_input_with_blank_reply() {
        let original = reply("   ");
        let result = parse("!tr fr", Some(&original)).unwrap();
        assert!(matches!(result, Err(CommandError::EmptyInput { .. })));
    }

    #[test]
    fn test_missing_language() {
        assert_eq!(parse("!tr", None).unwrap(), Err(CommandError::MissingLanguage));
        assert_eq!(parse("!tr   ", None).unwrap(), Err(CommandError::MissingLanguage));
    }

    #[test]
    fn test_missing_language_even_as_reply() {
        let original = reply("Good morning");
        assert_eq!(
            parse("!tr", Some(&original)).unwrap(),
            Err(CommandError::MissingLanguage)
        );
    }

    #[test]
    fn test_command_error_messages() {
        assert_eq!(
            CommandError::UnknownLanguage {
                language_code: "xx".to_string()
            }
            .to_string(),
            "unknown language code 'xx'"
        );
        assert_eq!(CommandError::MissingLanguage.to_string(), "no language code given");
    }
}
