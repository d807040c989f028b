use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{ApiResponse, EditMessageText, Message, SendMessage, Update};

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram api error: {0}")]
    Api(String),
}

/// Bot API calls the handlers make. Polling stays on the concrete client.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    async fn send_message(&self, request: SendMessage) -> Result<Message, TelegramError>;
    async fn edit_message_text(&self, request: EditMessageText) -> Result<(), TelegramError>;
    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError>;
}

#[async_trait]
impl<T: TelegramApi + ?Sized> TelegramApi for Arc<T> {
    async fn send_message(&self, request: SendMessage) -> Result<Message, TelegramError> {
        (**self).send_message(request).await
    }

    async fn edit_message_text(&self, request: EditMessageText) -> Result<(), TelegramError> {
        (**self).edit_message_text(request).await
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        (**self).answer_callback_query(callback_query_id).await
    }
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_api_url(TELEGRAM_API_URL, token)
    }

    pub fn with_api_url(api_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            (_, _) => Err(TelegramError::Api(
                response
                    .description
                    .unwrap_or_else(|| format!("{} returned no result", method)),
            )),
        }
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call(
            "getUpdates",
            &body,
            Duration::from_secs(timeout_secs) + REQUEST_TIMEOUT,
        )
        .await
    }

    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "deleteWebhook",
                &json!({ "drop_pending_updates": drop_pending_updates }),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TelegramApi for TelegramClient {
    async fn send_message(&self, request: SendMessage) -> Result<Message, TelegramError> {
        self.call("sendMessage", &request, REQUEST_TIMEOUT).await
    }

    async fn edit_message_text(&self, request: EditMessageText) -> Result<(), TelegramError> {
        // result is either the edited Message or `true`
        let _: serde_json::Value = self.call("editMessageText", &request, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_query_id }),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(())
    }
}
