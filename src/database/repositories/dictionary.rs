use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::database::DictionaryStore;
use crate::database::models::dictionary::WordEntity;
use crate::error::{AppError, AppResult};
use crate::models::AssociationsPayload;

/// Analysis cache keyed by normalized word.
#[derive(Clone)]
pub struct DictionaryRepository {
    pool: PgPool,
}

impl DictionaryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DictionaryStore for DictionaryRepository {
    async fn get_by_word(&self, word: &str) -> AppResult<Option<WordEntity>> {
        sqlx::query_as::<_, WordEntity>(
            r#"
            SELECT id, word, associations, updated_at
            FROM word_dictionary
            WHERE word = $1
            "#,
        )
        .bind(word)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database("Ошибка при чтении слова из БД", &e))
    }

    async fn upsert(&self, word: &str, associations: &AssociationsPayload) -> AppResult<WordEntity> {
        let result = sqlx::query_as::<_, WordEntity>(
            r#"
            INSERT INTO word_dictionary (id, word, associations)
            VALUES ($1, $2, $3)
            ON CONFLICT (word) DO UPDATE
            SET associations = EXCLUDED.associations,
                updated_at = now()
            RETURNING id, word, associations, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(word)
        .bind(Json(associations))
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(entry) => {
                tracing::info!(word, "Upserted word");
                Ok(entry)
            }
            Err(e) => {
                tracing::error!(word, "Failed to upsert word: {:?}", e);
                Err(AppError::database("Ошибка при сохранении слова в БД", &e))
            }
        }
    }
}
