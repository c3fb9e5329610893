//! Named-placeholder message templates.
//!
//! Templates use `{name}` placeholders (e.g. `"Unknown language {language_code}"`).
//! Only lower-case identifiers inside single braces are treated as placeholders;
//! any other brace text is kept literally. Templates are validated once when the
//! configuration is loaded, so rendering never fails.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Placeholder carrying the language code exactly as the user typed it.
pub const LANGUAGE_CODE: &str = "language_code";

/// Placeholder carrying a short summary of an upstream failure.
pub const ERROR: &str = "error";

/// Placeholder in the system prompt carrying the language description.
pub const LANGUAGE: &str = "language";

/// Placeholder in the usage message carrying the command word.
pub const COMMAND: &str = "command";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template '{template_name}' references unknown placeholder '{{{placeholder}}}' (allowed: {allowed})")]
    UnknownPlaceholder {
        template_name: String,
        placeholder: String,
        allowed: String,
    },
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("placeholder pattern is a valid regex")
    })
}

/// Names of all placeholders referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    placeholder_regex()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Reject templates that reference placeholders outside `allowed`.
pub fn validate(template_name: &str, template: &str, allowed: &[&str]) -> Result<(), TemplateError> {
    match placeholders(template)
        .into_iter()
        .find(|name| !allowed.contains(name))
    {
        Some(unknown) => Err(TemplateError::UnknownPlaceholder {
            template_name: template_name.to_string(),
            placeholder: unknown.to_string(),
            allowed: allowed.join(", "),
        }),
        None => Ok(()),
    }
}

/// Substitute `{key}` placeholders with their values.
///
/// Placeholders without a matching substitution are left as-is. Substituted
/// values are inserted verbatim and never re-scanned for placeholders.
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            substitutions
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
