use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

/// Application error shared by the API, the bot and the service layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Database { message: String, details: Value },
    #[error("{message}")]
    ExternalApi { message: String, details: Value },
    #[error("{0}")]
    Linguistic(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: Value::Null,
        }
    }

    pub fn database(message: impl Into<String>, err: &sqlx::Error) -> Self {
        AppError::Database {
            message: message.into(),
            details: serde_json::json!({ "error": err.to_string() }),
        }
    }

    pub fn external_api(message: impl Into<String>, details: Value) -> Self {
        AppError::ExternalApi {
            message: message.into(),
            details,
        }
    }

    /// Machine-readable code placed in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Database { .. } => "database_error",
            AppError::ExternalApi { .. } => "external_api_error",
            AppError::Linguistic(_) => "linguistic_logic_error",
            AppError::RateLimited(_) => "rate_limited",
            AppError::Internal(_) => "internal_server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalApi { .. } => StatusCode::BAD_GATEWAY,
            AppError::Linguistic(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    fn details(&self) -> Value {
        match self {
            AppError::Validation { details, .. }
            | AppError::Database { details, .. }
            | AppError::ExternalApi { details, .. } => details.clone(),
            _ => Value::Null,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    details: Value,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // internal details never leave the process
        let (message, details) = match &self {
            AppError::Internal(_) => (
                "Произошла внутренняя ошибка сервера".to_string(),
                Value::Null,
            ),
            other => (other.message(), other.details()),
        };

        tracing::error!(
            code = self.code(),
            status = status.as_u16(),
            "Application error occurred: {}",
            self
        );

        let body = Json(ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message,
                details,
            },
        });

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
