//! Language registry: the effective table of translation targets.
//!
//! The registry is built once from the built-in defaults and the instance
//! codes from configuration, then shared read-only for the process lifetime.

use crate::i18n::language::{normalize_code, LanguageEntry};
use std::collections::BTreeMap;

/// Effective set of language codes, keyed by normalized code.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: BTreeMap<String, LanguageEntry>,
}

impl LanguageRegistry {
    /// Build the effective registry.
    ///
    /// With `replace_list` the defaults are discarded and only `instance` is
    /// used. Otherwise `instance` is merged over `defaults`, instance entries
    /// winning on code collision. Later duplicates within one source win over
    /// earlier ones. Entries whose code normalizes to an empty string are skipped.
    pub fn build<'a, D, I>(defaults: D, instance: I, replace_list: bool) -> Self
    where
        D: IntoIterator<Item = (&'a str, &'a str)>,
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut registry = Self::default();

        if !replace_list {
            registry.extend(defaults);
        }
        registry.extend(instance);

        registry
    }

    /// Build from the built-in defaults merged with (or replaced by) `instance`.
    pub fn with_defaults<'a, I>(instance: I, replace_list: bool) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::build(default_languages().iter().copied(), instance, replace_list)
    }

    fn extend<'a>(&mut self, entries: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (code, description) in entries {
            let entry = LanguageEntry::new(code, description);
            if entry.code.is_empty() {
                continue;
            }
            self.languages.insert(entry.code.clone(), entry);
        }
    }

    /// Look up a language by code, ignoring case and surrounding whitespace.
    ///
    /// There is no fuzzy matching: an unknown code is `None`.
    pub fn resolve(&self, code: &str) -> Option<&LanguageEntry> {
        self.languages.get(&normalize_code(code))
    }

    /// All entries, sorted by code.
    pub fn entries(&self) -> impl Iterator<Item = &LanguageEntry> {
        self.languages.values()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

/// Built-in language codes (ISO 639-1 plus a few regional variants).
pub fn default_languages() -> &'static [(&'static str, &'static str)] {
    &[
        ("af", "Afrikaans"),
        ("am", "Amharic"),
        ("ar", "Arabic"),
        ("az", "Azerbaijani"),
        ("be", "Belarusian"),
        ("bg", "Bulgarian"),
        ("bn", "Bengali"),
        ("bs", "Bosnian"),
        ("ca", "Catalan"),
        ("cs", "Czech"),
        ("cy", "Welsh"),
        ("da", "Danish"),
        ("de", "German"),
        ("el", "Greek"),
        ("en", "English"),
        ("eo", "Esperanto"),
        ("es", "Spanish"),
        ("et", "Estonian"),
        ("eu", "Basque"),
        ("fa", "Persian"),
        ("fi", "Finnish"),
        ("fil", "Filipino"),
        ("fr", "French"),
        ("ga", "Irish"),
        ("gl", "Galician"),
        ("gu", "Gujarati"),
        ("he", "Hebrew"),
        ("hi", "Hindi"),
        ("hr", "Croatian"),
        ("hu", "Hungarian"),
        ("hy", "Armenian"),
        ("id", "Indonesian"),
        ("is", "Icelandic"),
        ("it", "Italian"),
        ("ja", "Japanese"),
        ("ka", "Georgian"),
        ("kk", "Kazakh"),
        ("km", "Khmer"),
        ("kn", "Kannada"),
        ("ko", "Korean"),
        ("la", "Latin"),
        ("lt", "Lithuanian"),
        ("lv", "Latvian"),
        ("mk", "Macedonian"),
        ("ml", "Malayalam"),
        ("mn", "Mongolian"),
        ("mr", "Marathi"),
        ("ms", "Malay"),
        ("mt", "Maltese"),
        ("my", "Burmese"),
        ("ne", "Nepali"),
        ("nl", "Dutch"),
        ("no", "Norwegian"),
        ("pa", "Punjabi"),
        ("pl", "Polish"),
        ("pt", "Portuguese"),
        ("pt-br", "Brazilian Portuguese"),
        ("ro", "Romanian"),
        ("ru", "Russian"),
        ("sk", "Slovak"),
        ("sl", "Slovenian"),
        ("sq", "Albanian"),
        ("sr", "Serbian"),
        ("sv", "Swedish"),
        ("sw", "Swahili"),
        ("ta", "Tamil"),
        ("te", "Telugu"),
        ("th", "Thai"),
        ("tr", "Turkish"),
        ("uk", "Ukrainian"),
        ("ur", "Urdu"),
        ("uz", "Uzbek"),
        ("vi", "Vietnamese"),
        ("zh", "Chinese (Simplified)"),
        ("zh-tw", "Chinese (Traditional)"),
    ]
}
