use anyhow::{bail, Result};
use openai_translate_bot::bot::TranslateBot;
use openai_translate_bot::config::Config;
use openai_translate_bot::telegram::{self, AppState, TelegramClient};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("openai_translate_bot=info".parse()?),
        )
        .init();

    info!("Starting translation bot");

    // Load configuration from environment (.env is read if present)
    let config = Config::from_env()?;

    if config.telegram.bot_token.is_empty() {
        bail!("TELEGRAM_BOT_TOKEN is required");
    }
    if config.telegram.webhook_secret.is_empty() {
        bail!("TELEGRAM_WEBHOOK_SECRET is required");
    }

    info!(
        "Using model {} at {}",
        config.openai.model,
        config.openai.endpoint()
    );

    let state = AppState {
        bot: Arc::new(TranslateBot::new(&config)?),
        telegram: Arc::new(TelegramClient::new(&config.telegram)),
        webhook_secret: Arc::from(config.telegram.webhook_secret.as_str()),
    };

    let app = telegram::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.telegram.port);
    info!("Listening for webhooks on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
