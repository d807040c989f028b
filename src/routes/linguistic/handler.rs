use std::time::Instant;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::json;

use super::model::{LinguisticRequest, LinguisticResponse};
use crate::{
    AppState,
    error::AppError,
    models::RequestSource,
    utils::{normalize_word, validate_word},
};

/// Synonym and antonym analysis for a single word.
///
/// Validation failures answer 422; analysis failures still answer 200 with
/// `status: "failed"` and the error message.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<LinguisticRequest>, JsonRejection>,
) -> Result<Json<LinguisticResponse>, AppError> {
    let started = Instant::now();

    let Json(req) = payload.map_err(|rejection| AppError::Validation {
        message: "Ошибка валидации входных данных".to_string(),
        details: json!({ "error": rejection.body_text() }),
    })?;
    validate_word(&req.text)?;

    let word = normalize_word(&req.text);
    tracing::info!(word = %word, language = %req.language, "API analysis request");

    let outcome = state
        .linguistic
        .analyze_word(&word, RequestSource::Api, None)
        .await;

    Ok(Json(LinguisticResponse::from_outcome(
        word,
        req.request_type,
        outcome,
        started.elapsed().as_secs_f64(),
    )))
}
