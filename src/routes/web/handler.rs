use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::Html,
};
use serde::Deserialize;
use serde_json::json;

use super::fragment::{render_error, render_outcome};
use crate::{AppState, error::AppError, models::RequestSource, utils::is_cyrillic};

const INDEX_HTML: &str = include_str!("../../../static/index.html");

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    pub text: String,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// htmx endpoint: answers with a result fragment. Only a malformed form body
/// gets the JSON error envelope.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Form<AnalyzeForm>, FormRejection>,
) -> Result<Html<String>, AppError> {
    let Form(form) = payload.map_err(|rejection| AppError::Validation {
        message: "Ошибка валидации входных данных".to_string(),
        details: json!({ "error": rejection.body_text() }),
    })?;
    tracing::info!(text = %form.text, "Web analysis request");

    if !is_cyrillic(form.text.trim()) {
        return Ok(Html(render_error(
            &form.text,
            "Пожалуйста, используйте только кириллицу.",
        )));
    }

    let outcome = state
        .linguistic
        .analyze_word(&form.text, RequestSource::Web, None)
        .await;
    Ok(Html(render_outcome(&form.text, &outcome)))
}
