use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::HistoryStore;
use crate::database::models::history::HistoryEntity;
use crate::error::{AppError, AppResult};
use crate::models::RequestSource;

/// Request history storage.
#[derive(Clone)]
pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for HistoryRepository {
    async fn create(
        &self,
        source: RequestSource,
        original_text: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<HistoryEntity> {
        let result = sqlx::query_as::<_, HistoryEntity>(
            r#"
            INSERT INTO request_history (id, user_id, source, original_text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, source, original_text, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(source.as_str())
        .bind(original_text)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(entry) => {
                tracing::info!(source = %source, original_text, "Created history entry");
                Ok(entry)
            }
            Err(e) => {
                tracing::error!(source = %source, original_text, "Failed to create history entry: {:?}", e);
                Err(AppError::database("Ошибка при создании записи в БД", &e))
            }
        }
    }

    async fn get_by_user_id(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<HistoryEntity>> {
        sqlx::query_as::<_, HistoryEntity>(
            r#"
            SELECT id, user_id, source, original_text, created_at
            FROM request_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database("Ошибка при чтении истории из БД", &e))
    }
}
