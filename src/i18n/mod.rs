//! Language support for translation targets.
//!
//! # Architecture
//!
//! - `registry`: the effective set of language codes, built from the built-in
//!   defaults and the instance codes from configuration
//! - `language`: the `LanguageEntry` type and code normalization
//!
//! # Example
//!
//! ```rust
//! use openai_translate_bot::i18n::LanguageRegistry;
//!
//! let registry = LanguageRegistry::with_defaults([("fr", "French (formal)")], false);
//! assert_eq!(registry.resolve(" FR ").unwrap().description, "French (formal)");
//! ```

mod language;
mod registry;

pub use language::{normalize_code, LanguageEntry};
pub use registry::{default_languages, LanguageRegistry};
