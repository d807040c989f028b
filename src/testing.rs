//! In-memory stand-ins for the Postgres stores and the LLM analyzer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::AppState;
use crate::config::Config;
use crate::database::{
    DictionaryStore, HistoryEntity, HistoryStore, TelegramProfile, UserEntity, UserStore,
    WordEntity,
};
use crate::error::{AppError, AppResult};
use crate::models::{AssociationsPayload, RequestSource, WordAssociation};
use crate::services::{AnalyzeError, LinguisticService, WordAnalyzer};

#[derive(Default)]
pub struct MemoryDictionary {
    words: Mutex<HashMap<String, AssociationsPayload>>,
    broken: bool,
}

impl MemoryDictionary {
    /// Every call fails like a lost database connection.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, word: &str, items: Vec<WordAssociation>) {
        self.words
            .lock()
            .unwrap()
            .insert(word.to_string(), AssociationsPayload { items });
    }

    pub fn items(&self, word: &str) -> Option<Vec<WordAssociation>> {
        self.words
            .lock()
            .unwrap()
            .get(word)
            .map(|payload| payload.items.clone())
    }

    fn check(&self) -> AppResult<()> {
        if self.broken {
            Err(AppError::database(
                "Ошибка при чтении слова из БД",
                &sqlx::Error::PoolTimedOut,
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DictionaryStore for MemoryDictionary {
    async fn get_by_word(&self, word: &str) -> AppResult<Option<WordEntity>> {
        self.check()?;
        Ok(self.words.lock().unwrap().get(word).map(|payload| WordEntity {
            id: Uuid::new_v4(),
            word: word.to_string(),
            associations: Json(payload.clone()),
            updated_at: Utc::now(),
        }))
    }

    async fn upsert(&self, word: &str, associations: &AssociationsPayload) -> AppResult<WordEntity> {
        self.check()?;
        self.words
            .lock()
            .unwrap()
            .insert(word.to_string(), associations.clone());
        Ok(WordEntity {
            id: Uuid::new_v4(),
            word: word.to_string(),
            associations: Json(associations.clone()),
            updated_at: Utc::now(),
        })
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntity>>,
}

impl MemoryHistory {
    pub fn sources(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.source.clone(), e.original_text.clone()))
            .collect()
    }

    pub fn user_ids(&self) -> Vec<Option<Uuid>> {
        self.entries.lock().unwrap().iter().map(|e| e.user_id).collect()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn create(
        &self,
        source: RequestSource,
        original_text: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<HistoryEntity> {
        let entry = HistoryEntity {
            id: Uuid::new_v4(),
            user_id,
            source: source.as_str().to_string(),
            original_text: original_text.to_string(),
            created_at: Utc::now(),
        };
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn get_by_user_id(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<HistoryEntity>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.user_id == Some(user_id))
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<HashMap<i64, UserEntity>>,
    read_only: bool,
}

impl MemoryUsers {
    /// Lookups work, upserts fail like a read-only replica.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, telegram_id: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            telegram_id,
            UserEntity {
                id,
                telegram_id,
                username: None,
                first_name: None,
                last_name: None,
                created_at: Utc::now(),
            },
        );
        id
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn get_by_telegram_id(&self, telegram_id: i64) -> AppResult<Option<UserEntity>> {
        Ok(self.users.lock().unwrap().get(&telegram_id).cloned())
    }

    async fn upsert_telegram_user(&self, profile: &TelegramProfile) -> AppResult<UserEntity> {
        if self.read_only {
            return Err(AppError::database(
                "Ошибка при сохранении пользователя",
                &sqlx::Error::PoolTimedOut,
            ));
        }
        let mut users = self.users.lock().unwrap();
        let user = users
            .entry(profile.telegram_id)
            .or_insert_with(|| UserEntity {
                id: Uuid::new_v4(),
                telegram_id: profile.telegram_id,
                username: None,
                first_name: None,
                last_name: None,
                created_at: Utc::now(),
            });
        user.username = profile.username.clone();
        user.first_name = profile.first_name.clone();
        user.last_name = profile.last_name.clone();
        Ok(user.clone())
    }
}

enum Behaviour {
    Return(Vec<WordAssociation>),
    UnknownWord,
    Fail,
}

pub struct FakeAnalyzer {
    behaviour: Behaviour,
    calls: Mutex<Vec<String>>,
}

impl FakeAnalyzer {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(items: Vec<WordAssociation>) -> Self {
        Self::with(Behaviour::Return(items))
    }

    pub fn unknown_word() -> Self {
        Self::with(Behaviour::UnknownWord)
    }

    pub fn failing() -> Self {
        Self::with(Behaviour::Fail)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WordAnalyzer for FakeAnalyzer {
    async fn analyze(&self, word: &str) -> Result<Vec<WordAssociation>, AnalyzeError> {
        self.calls.lock().unwrap().push(word.to_string());
        match &self.behaviour {
            Behaviour::Return(items) => Ok(items.clone()),
            Behaviour::UnknownWord => Err(AnalyzeError::UnknownWord(word.to_string())),
            Behaviour::Fail => Err(AppError::external_api(
                "Ошибка при обращении к AI сервису",
                serde_json::json!({ "error": "timeout", "word": word }),
            )
            .into()),
        }
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| (key == "LLM_API_KEY").then(|| "sk-test".to_string()))
        .expect("test config")
}

/// `AppState` over in-memory stores, with handles for assertions.
pub struct TestApp {
    pub state: AppState,
    pub history: Arc<MemoryHistory>,
    pub analyzer: Arc<FakeAnalyzer>,
}

pub fn test_app(analyzer: FakeAnalyzer) -> TestApp {
    let history = Arc::new(MemoryHistory::default());
    let analyzer = Arc::new(analyzer);
    let linguistic = Arc::new(LinguisticService::new(
        Arc::new(MemoryDictionary::default()),
        history.clone(),
        analyzer.clone(),
    ));
    TestApp {
        state: AppState {
            config: Arc::new(test_config()),
            linguistic,
            users: Arc::new(MemoryUsers::default()),
            history: history.clone(),
        },
        history,
        analyzer,
    }
}
