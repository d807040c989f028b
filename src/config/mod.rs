use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which long-running process this instance launches after bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// HTTP API server. Also the primary instance for migrations.
    App,
    Bot,
}

impl RunMode {
    /// Exactly `bot` selects the bot, anything else (including unset) the API server.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("bot") => RunMode::Bot,
            _ => RunMode::App,
        }
    }

    pub fn is_primary(self) -> bool {
        self == RunMode::App
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::App => "app",
            RunMode::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Testing,
}

impl AppEnv {
    pub fn as_str(self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
            AppEnv::Testing => "testing",
        }
    }
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(AppEnv::Development),
            "production" => Ok(AppEnv::Production),
            "testing" => Ok(AppEnv::Testing),
            other => Err(ConfigError::Invalid {
                key: "APP_ENV",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_retries: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,
    pub log_level: String,
    pub run_mode: RunMode,
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub telegram_bot_token: Option<String>,
    pub admin_chat_id: Option<String>,
    pub llm: LlmConfig,
    pub redis_url: Option<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub migrations_dir: PathBuf,
    pub migration_wait_retries: u32,
    pub migration_wait_interval_secs: u64,
}

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_env = match get("APP_ENV") {
            Some(v) => v.parse()?,
            None => AppEnv::Development,
        };

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                get("DB_USER").unwrap_or_else(|| "postgres".into()),
                get("DB_PASSWORD").unwrap_or_else(|| "postgres".into()),
                get("DB_HOST").unwrap_or_else(|| "db".into()),
                parse_or(get("DB_PORT"), "DB_PORT", 5432u16)?,
                get("DB_NAME").unwrap_or_else(|| "lexicon".into()),
            ),
        };

        let llm = LlmConfig {
            base_url: get("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
            api_key: get("LLM_API_KEY").ok_or(ConfigError::Missing("LLM_API_KEY"))?,
            model: get("LLM_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".into()),
            temperature: parse_or(get("LLM_TEMPERATURE"), "LLM_TEMPERATURE", 0.3)?,
            max_retries: parse_or(get("LLM_MAX_RETRIES"), "LLM_MAX_RETRIES", 2)?,
            timeout: parse_secs_f64(get("LLM_TIMEOUT"), "LLM_TIMEOUT", Duration::from_secs(60))?,
        };

        Ok(Config {
            app_env,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            run_mode: RunMode::from_env_value(get("RUN_MODE").as_deref()),
            database_url,
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or(get("APP_PORT"), "APP_PORT", 8000)?,
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            admin_chat_id: get("ADMIN_CHAT_ID"),
            llm,
            redis_url: get("REDIS_URL"),
            rate_limit_window_secs: parse_or(get("RATE_LIMIT_WINDOW"), "RATE_LIMIT_WINDOW", 60)?,
            rate_limit_requests: parse_or(get("RATE_LIMIT_REQUESTS"), "RATE_LIMIT_REQUESTS", 30)?,
            migrations_dir: get("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("migrations")),
            migration_wait_retries: parse_or(
                get("MIGRATION_WAIT_RETRIES"),
                "MIGRATION_WAIT_RETRIES",
                30,
            )?,
            migration_wait_interval_secs: parse_or(
                get("MIGRATION_WAIT_INTERVAL"),
                "MIGRATION_WAIT_INTERVAL",
                2,
            )?,
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn migration_wait_interval(&self) -> Duration {
        Duration::from_secs(self.migration_wait_interval_secs)
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

/// Fractional seconds; negative, NaN and infinite values are rejected.
fn parse_secs_f64(
    value: Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(v) = value else {
        return Ok(default);
    };
    v.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or(ConfigError::Invalid { key, value: v })
}
