pub mod bot;
pub mod classify;
pub mod command;
pub mod config;
pub mod i18n;
pub mod openai;
pub mod rate_limit;
pub mod retry;
pub mod telegram;
pub mod templates;
