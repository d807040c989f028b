use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One analysis request, whatever its outcome.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryEntity {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub source: String,
    pub original_text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
