//! Registration bot
//!
//! Walks Telegram users through a short registration dialogue, stores the
//! result and announces it in a channel.

mod api;
mod config;
mod db;
mod notify;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use chrono::Utc;
use config::BotConfig;
use db::Database;
use notify::{TelegramClient, TelegramNotifier, TelegramOutbox};
use runtime::{DatabaseStorage, Dispatcher, ProductionDispatcher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regbot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;
    spawn_cache_purge(db.clone(), config.conversation_ttl);

    let client = Arc::new(TelegramClient::new(&config.bot_token, &config.api_url)?);
    let storage = DatabaseStorage::new(db);
    let dispatcher: ProductionDispatcher = Dispatcher::new(
        storage.clone(),
        storage,
        TelegramNotifier::new(Arc::clone(&client), config.channel_id.clone()),
        TelegramOutbox::new(client),
        config.conversation_ttl,
    );

    if config.webhook_secret.is_none() {
        tracing::warn!("TELEGRAM_WEBHOOK_SECRET not set; webhook calls are not authenticated");
    }
    let state = AppState::new(Arc::new(dispatcher), config.webhook_secret.clone());
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        ttl_secs = config.conversation_ttl.as_secs(),
        "Registration bot listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Expired conversations are already invisible to readers; this only
/// reclaims the rows of users who never came back.
fn spawn_cache_purge(db: Database, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(60)));
        loop {
            interval.tick().await;
            match db.purge_expired_states(Utc::now()) {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired conversations"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired conversations"),
            }
        }
    });
}
