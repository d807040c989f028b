use std::sync::Arc;

use config::Config;
use database::{
    DictionaryRepository, HistoryRepository, HistoryStore, UserRepository, UserStore,
};
use services::{LinguisticService, LlmAnalyzer};
use sqlx::PgPool;

pub mod bootstrap;
pub mod bot;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
pub mod shutdown;
pub mod telegram;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub linguistic: Arc<LinguisticService>,
    pub users: Arc<dyn UserStore>,
    pub history: Arc<dyn HistoryStore>,
}

impl AppState {
    /// Wires the Postgres repositories and the LLM client together.
    pub fn from_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        let analyzer = Arc::new(LlmAnalyzer::new(config.llm.clone())?);
        let history: Arc<dyn HistoryStore> = Arc::new(HistoryRepository::new(pool.clone()));
        let linguistic = Arc::new(LinguisticService::new(
            Arc::new(DictionaryRepository::new(pool.clone())),
            history.clone(),
            analyzer,
        ));

        Ok(Self {
            config: Arc::new(config),
            linguistic,
            users: Arc::new(UserRepository::new(pool)),
            history,
        })
    }
}
