use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::LlmConfig;
use crate::error::AppError;
use crate::models::WordAssociation;

const SYSTEM_PROMPT: &str = "Ты - эксперт-лингвист. Твоя задача - провести морфологический и семантический анализ слова. \
1. Проверь, существует ли слово в русском языке. Имена собственные считаются существующими. \
2. Если слово существует: подбери ровно 5 синонимов и 5 антонимов. \
3. Если слово НЕ существует (например, набор букв 'фдыва', 'ккк'): установи is_exists=false, а списки пустыми. \
4. Верни результат строго в JSON формате:\n\
{\n  \"is_exists\": true/false,\n  \"synonyms\": [\"слово1\", \"слово2\"...],\n  \"antonyms\": [\"слово1\", \"слово2\"...]\n}\n\
5. Убедись, что слова корректны и соответствуют части речи исходного слова.";

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Слово '{0}' не найдено в русском языке.")]
    UnknownWord(String),
    #[error(transparent)]
    App(#[from] AppError),
}

/// Produces synonyms and antonyms for a normalized word.
#[async_trait]
pub trait WordAnalyzer: Send + Sync {
    async fn analyze(&self, word: &str) -> Result<Vec<WordAssociation>, AnalyzeError>;
}

/// Structured answer the model is asked to return.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisResponse {
    pub is_exists: bool,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
}

impl AnalysisResponse {
    /// Synonyms first, then antonyms. Blank entries are dropped.
    pub fn into_associations(self, word: &str) -> Result<Vec<WordAssociation>, AnalyzeError> {
        if !self.is_exists {
            return Err(AnalyzeError::UnknownWord(word.to_string()));
        }

        let clean = |w: String| {
            let w = w.trim().to_string();
            (!w.is_empty()).then_some(w)
        };

        let mut associations = Vec::with_capacity(self.synonyms.len() + self.antonyms.len());
        associations.extend(
            self.synonyms
                .into_iter()
                .filter_map(clean)
                .map(WordAssociation::synonym),
        );
        associations.extend(
            self.antonyms
                .into_iter()
                .filter_map(clean)
                .map(WordAssociation::antonym),
        );
        Ok(associations)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Parses model output, tolerating a surrounding markdown code fence.
pub fn parse_analysis(content: &str) -> Result<AnalysisResponse, serde_json::Error> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim())
}

/// OpenAI-compatible chat completion client.
pub struct LlmAnalyzer {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmAnalyzer {
    pub fn new(config: LlmConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    async fn request_completion(&self, word: &str) -> Result<String, AppError> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": format!("Проанализируй слово: {}", word) },
            ],
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| external_error(word, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(external_error(word, format!("HTTP {}: {}", status, text)));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| external_error(word, e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| external_error(word, "empty completion".to_string()))
    }
}

fn external_error(word: &str, error: String) -> AppError {
    AppError::external_api(
        "Ошибка при обращении к AI сервису",
        json!({ "error": error, "word": word }),
    )
}

#[async_trait]
impl WordAnalyzer for LlmAnalyzer {
    async fn analyze(&self, word: &str) -> Result<Vec<WordAssociation>, AnalyzeError> {
        tracing::info!(word, model = %self.config.model, "Invoking AI analysis");

        let mut attempt = 0;
        let content = loop {
            match self.request_completion(word).await {
                Ok(content) => break content,
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(word, attempt, "AI request failed, retrying: {}", e);
                }
                Err(e) => {
                    tracing::error!(word, "AI request failed: {:?}", e);
                    return Err(e.into());
                }
            }
        };

        let response = parse_analysis(&content).map_err(|e| {
            tracing::error!(word, content = %content, "Unparseable AI response: {}", e);
            external_error(word, e.to_string())
        })?;

        tracing::info!(
            word,
            is_exists = response.is_exists,
            synonyms_count = response.synonyms.len(),
            antonyms_count = response.antonyms.len(),
            "Received response from LLM"
        );

        if !response.is_exists {
            tracing::warn!(word, "Word not found by AI");
        }
        response.into_associations(word)
    }
}
