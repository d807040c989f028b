use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::UserStore;
use crate::database::models::user::{TelegramProfile, UserEntity};
use crate::error::{AppError, AppResult};

/// Users seen by the Telegram bot.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get_by_telegram_id(&self, telegram_id: i64) -> AppResult<Option<UserEntity>> {
        sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, telegram_id, username, first_name, last_name, created_at
            FROM users
            WHERE telegram_id = $1
            "#,
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database("Ошибка при чтении пользователя из БД", &e))
    }

    async fn upsert_telegram_user(&self, profile: &TelegramProfile) -> AppResult<UserEntity> {
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (id, telegram_id, username, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (telegram_id) DO UPDATE
            SET username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name
            RETURNING id, telegram_id, username, first_name, last_name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(profile.telegram_id)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => {
                tracing::debug!(telegram_id = user.telegram_id, "Upserted telegram user");
                Ok(user)
            }
            Err(e) => {
                tracing::error!(telegram_id = profile.telegram_id, "Failed to upsert user: {:?}", e);
                Err(AppError::database("Ошибка при сохранении пользователя в БД", &e))
            }
        }
    }
}
