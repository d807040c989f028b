use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AnalysisOutcome, ProcessingStatus, RequestType, WordAssociation};

fn default_language() -> String {
    "ru".to_string()
}

#[derive(Debug, Deserialize)]
pub struct LinguisticRequest {
    pub text: String,
    #[serde(default)]
    pub request_type: RequestType,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinguisticResponse {
    pub request_id: Uuid,
    pub original_text: String,
    pub request_type: RequestType,
    pub status: ProcessingStatus,
    pub result: Option<Vec<WordAssociation>>,
    pub error: Option<String>,
    /// Seconds spent in the handler.
    pub execution_time: Option<f64>,
}

impl LinguisticResponse {
    pub fn from_outcome(
        original_text: String,
        request_type: RequestType,
        outcome: AnalysisOutcome,
        execution_time: f64,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            original_text,
            request_type,
            status: outcome.status,
            result: outcome.result,
            error: outcome.error,
            execution_time: Some(execution_time),
        }
    }
}
