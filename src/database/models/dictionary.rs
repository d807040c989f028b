use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::AssociationsPayload;

/// Cached analysis for one normalized word.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WordEntity {
    pub id: Uuid,
    pub word: String,
    pub associations: Json<AssociationsPayload>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
