//! Telegram bot running in long-polling mode.

pub mod format;
pub mod handlers;
pub mod keyboards;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::AppState;
use crate::shutdown::shutdown_signal;
use crate::telegram::TelegramClient;

pub use handlers::{BotContext, handle_update};

const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub async fn run(state: AppState) -> anyhow::Result<()> {
    let token = state
        .config
        .telegram_bot_token
        .as_deref()
        .context("TELEGRAM_BOT_TOKEN must be set in bot mode")?;
    let client = Arc::new(TelegramClient::new(token));

    // polling and webhooks are mutually exclusive; stale updates are dropped
    client
        .delete_webhook(true)
        .await
        .context("failed to delete webhook")?;

    let ctx = BotContext::new(client.clone(), &state);
    tracing::info!("Bot started, polling for updates");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut offset = 0;
    loop {
        let updates = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Stopping bot");
                return Ok(());
            }
            result = client.get_updates(offset, POLL_TIMEOUT_SECS) => result,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!("Failed to fetch updates: {}", e);
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let ctx = ctx.clone();
            tokio::spawn(async move { handle_update(&ctx, update).await });
        }
    }
}
