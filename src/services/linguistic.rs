use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::database::{DictionaryStore, HistoryStore};
use crate::error::AppError;
use crate::models::{AnalysisOutcome, AssociationsPayload, RequestSource, WordAssociation};
use crate::services::analyzer::{AnalyzeError, WordAnalyzer};
use crate::utils::normalize_word;

const INTERNAL_ERROR_MESSAGE: &str = "Произошла внутренняя ошибка при анализе слова";

/// Cache lookup, AI call, cache write and history record for one word.
pub struct LinguisticService {
    dictionary: Arc<dyn DictionaryStore>,
    history: Arc<dyn HistoryStore>,
    analyzer: Arc<dyn WordAnalyzer>,
}

impl LinguisticService {
    pub fn new(
        dictionary: Arc<dyn DictionaryStore>,
        history: Arc<dyn HistoryStore>,
        analyzer: Arc<dyn WordAnalyzer>,
    ) -> Self {
        Self {
            dictionary,
            history,
            analyzer,
        }
    }

    /// Never fails: every error is folded into a `failed` outcome.
    pub async fn analyze_word(
        &self,
        word: &str,
        source: RequestSource,
        user_id: Option<Uuid>,
    ) -> AnalysisOutcome {
        let word = normalize_word(word);
        let span = tracing::info_span!("analyze_word", word = %word, source = %source);

        async {
            tracing::info!("Starting word analysis");
            match self.run(&word, source, user_id).await {
                Ok(outcome) => outcome,
                Err(AppError::Internal(e)) => {
                    tracing::error!("Unexpected error during word analysis: {}", e);
                    AnalysisOutcome::failed(INTERNAL_ERROR_MESSAGE)
                }
                Err(e) => {
                    tracing::error!(code = e.code(), "Known app error during word analysis: {}", e);
                    AnalysisOutcome::failed(e.message())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        word: &str,
        source: RequestSource,
        user_id: Option<Uuid>,
    ) -> Result<AnalysisOutcome, AppError> {
        if let Some(cached) = self.dictionary.get_by_word(word).await? {
            tracing::info!("Cache hit for word");
            self.history.create(source, word, user_id).await?;
            return Ok(AnalysisOutcome::completed(cached.associations.0.items));
        }

        tracing::info!("Cache miss, calling AI analyzer");
        let analysis = self.analyzer.analyze(word).await;

        if let Ok(items) = &analysis {
            if !items.is_empty() {
                tracing::info!("Saving results to cache");
                let payload = AssociationsPayload {
                    items: items.clone(),
                };
                self.dictionary.upsert(word, &payload).await?;
            }
        }

        self.history.create(source, word, user_id).await?;

        Ok(outcome_from(analysis))
    }
}

fn outcome_from(analysis: Result<Vec<WordAssociation>, AnalyzeError>) -> AnalysisOutcome {
    match analysis {
        Ok(items) => AnalysisOutcome::completed(items),
        Err(AnalyzeError::UnknownWord(word)) => {
            tracing::warn!(word = %word, "Unknown word");
            AnalysisOutcome::failed(AnalyzeError::UnknownWord(word).to_string())
        }
        Err(AnalyzeError::App(e)) => {
            tracing::error!(code = e.code(), "AI analyzer returned error: {}", e);
            AnalysisOutcome::failed(e.message())
        }
    }
}
