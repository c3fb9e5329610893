//! Language entry: a normalized code paired with its description.

/// A translation target known to the registry.
///
/// The `description` is what gets substituted into the system prompt, so it
/// can be richer than a bare name (e.g. "French (formal register)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageEntry {
    /// Normalized language code (trimmed, lower-case), e.g. "fr", "pt-br"
    pub code: String,

    /// Human-readable description, e.g. "French"
    pub description: String,
}

impl LanguageEntry {
    /// Create an entry, normalizing the code.
    pub fn new(code: &str, description: impl Into<String>) -> Self {
        Self {
            code: normalize_code(code),
            description: description.into(),
        }
    }
}

/// Normalize a language code for storage and lookup: trim and lower-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}
