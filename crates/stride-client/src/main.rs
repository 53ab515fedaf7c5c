use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use stride_backend::{HttpBackend, WsFeed};
use stride_cache::SqliteStore;
use stride_sync::{dispatcher, Notification, NotificationSink, SyncEngine};

/// Headless sink: surfaces notifications through the log. A desktop or
/// mobile shell replaces this with the platform notification API.
struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, notification: Notification) {
        info!(
            "notification [{}]: {} — {} ({})",
            notification.tag, notification.title, notification.body, notification.deep_link
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stride=debug".into()),
        )
        .init();

    // Config
    let api_url =
        std::env::var("STRIDE_API_URL").unwrap_or_else(|_| "http://localhost:3000".into());
    let feed_url =
        std::env::var("STRIDE_FEED_URL").unwrap_or_else(|_| "ws://localhost:3000/feed".into());
    let cache_path =
        std::env::var("STRIDE_CACHE_PATH").unwrap_or_else(|_| "stride-cache.db".into());
    let user_id: Uuid = std::env::var("STRIDE_USER_ID")?.parse()?;

    // Offline cache
    let store = SqliteStore::open(&PathBuf::from(&cache_path))?;

    // Backend
    let mut backend = HttpBackend::new(&api_url);
    if let Ok(token) = std::env::var("STRIDE_TOKEN") {
        backend = backend.with_token(&token);
    }

    let engine = SyncEngine::new(user_id, Arc::new(backend), store, LogSink);

    // First pull before going live; a cached snapshot covers cold offline
    // starts.
    if let Err(e) = engine.refresh().await {
        tracing::warn!("initial directory pull failed: {}", e);
    }
    let directory = engine.directory();
    info!(
        "directory ready: {} conversations{}",
        directory.conversations.len(),
        if directory.stale { " (stale)" } else { "" }
    );

    // Log directory updates as they land.
    let mut updates = engine.watch_directory();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let directory = updates.borrow_and_update().clone();
            let unread: u32 = directory.conversations.iter().map(|c| c.unread_count).sum();
            info!(
                "directory updated: {} conversations, {} unread{}",
                directory.conversations.len(),
                unread,
                if directory.stale { " (stale)" } else { "" }
            );
        }
    });

    info!("Stride sync engine starting for user {}", user_id);
    dispatcher::run(WsFeed::new(&feed_url), engine).await;

    Ok(())
}
