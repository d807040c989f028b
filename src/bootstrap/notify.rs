use tokio::task::JoinHandle;

use crate::config::Config;
use crate::telegram::{ChatId, SendMessage, TelegramApi, TelegramClient};

pub const STARTUP_MESSAGE: &str =
    "🚀 <b>LexiconAI</b>\n\nСервис успешно запущен и готов к работе.";

/// One-way startup ping to the admin chat.
pub struct StartupNotifier<C = TelegramClient> {
    client: C,
    chat_id: ChatId,
}

impl StartupNotifier<TelegramClient> {
    /// `None` unless both `TELEGRAM_BOT_TOKEN` and `ADMIN_CHAT_ID` are set.
    pub fn from_config(config: &Config) -> Option<Self> {
        let token = config.telegram_bot_token.as_deref()?;
        let chat_id = config.admin_chat_id.as_deref()?;
        Some(Self::new(TelegramClient::new(token), ChatId::parse(chat_id)))
    }
}

impl<C: TelegramApi + 'static> StartupNotifier<C> {
    pub fn new(client: C, chat_id: ChatId) -> Self {
        Self { client, chat_id }
    }

    /// Sends the message; failures are only logged at debug level.
    pub async fn notify(&self) {
        let request = SendMessage::new(self.chat_id.clone(), STARTUP_MESSAGE).html();
        match self.client.send_message(request).await {
            Ok(_) => tracing::debug!("Startup notification sent"),
            Err(e) => tracing::debug!("Startup notification dropped: {}", e),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.notify().await })
    }
}
