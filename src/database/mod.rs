// Postgres persistence: row entities, repositories and the store traits
// the service layer depends on.

pub mod models;
pub mod repositories;

use async_trait::async_trait;
use sqlx::Executor;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{AssociationsPayload, RequestSource};

pub use models::dictionary::WordEntity;
pub use models::history::HistoryEntity;
pub use models::user::{TelegramProfile, UserEntity};
pub use repositories::dictionary::DictionaryRepository;
pub use repositories::history::HistoryRepository;
pub use repositories::user::UserRepository;

/// Word cache backed by `word_dictionary`.
#[async_trait]
pub trait DictionaryStore: Send + Sync {
    async fn get_by_word(&self, word: &str) -> AppResult<Option<WordEntity>>;
    async fn upsert(&self, word: &str, associations: &AssociationsPayload) -> AppResult<WordEntity>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn create(
        &self,
        source: RequestSource,
        original_text: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<HistoryEntity>;

    /// Newest first.
    async fn get_by_user_id(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<HistoryEntity>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_telegram_id(&self, telegram_id: i64) -> AppResult<Option<UserEntity>>;
    async fn upsert_telegram_user(&self, profile: &TelegramProfile) -> AppResult<UserEntity>;
}

pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'lexicon';").await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
