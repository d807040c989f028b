//! Schema migrations stored as `<version>_<description>.sql` files and applied
//! with the sqlx migrator.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};

/// Baseline schema written by the primary instance on first start.
pub const INITIAL_SCHEMA: &str = r#"-- initial schema
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    telegram_id BIGINT NOT NULL UNIQUE,
    username VARCHAR(255),
    first_name VARCHAR(255),
    last_name VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS request_history (
    id UUID PRIMARY KEY,
    user_id UUID,
    source VARCHAR(50) NOT NULL DEFAULT 'web',
    original_text TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS ix_request_history_user_id ON request_history (user_id);

CREATE TABLE IF NOT EXISTS word_dictionary (
    id UUID PRIMARY KEY,
    word VARCHAR(255) NOT NULL UNIQUE,
    associations JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("migration directory error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Migrate(#[from] MigrateError),
    #[error("invalid migration name {0:?}")]
    InvalidName(String),
}

/// Operations the startup sequence needs from the migration tooling.
#[async_trait]
pub trait MigrationTool: Send + Sync {
    async fn ensure_dir(&self) -> Result<(), MigrationError>;
    async fn has_migrations(&self) -> Result<bool, MigrationError>;
    async fn generate_initial(&self) -> Result<PathBuf, MigrationError>;
    async fn upgrade(&self) -> Result<(), MigrationError>;
}

/// Directory holding migration files.
#[derive(Debug, Clone)]
pub struct MigrationDir {
    path: PathBuf,
}

impl MigrationDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn ensure(&self) -> Result<(), MigrationError> {
        tokio::fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// True once at least one `*.sql` file is present.
    pub async fn has_migrations(&self) -> Result<bool, MigrationError> {
        let mut entries = match tokio::fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "sql") && entry.file_type().await?.is_file()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn generate_initial(&self) -> Result<PathBuf, MigrationError> {
        self.write("initial", INITIAL_SCHEMA).await
    }

    /// Creates an empty migration for hand editing.
    pub async fn generate(&self, name: &str) -> Result<PathBuf, MigrationError> {
        let description = sanitize_name(name)?;
        self.write(&description, &format!("-- {}\n", description)).await
    }

    async fn write(&self, description: &str, contents: &str) -> Result<PathBuf, MigrationError> {
        self.ensure().await?;
        let version = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let file_name = format!("{}_{}.sql", version, description);
        let path = self.path.join(&file_name);

        // other instances poll this directory: the `.sql` name only appears complete
        let staging = self.path.join(format!(".{}.tmp", file_name));
        tokio::fs::write(&staging, contents).await?;
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        tracing::info!(path = %path.display(), "Generated migration");
        Ok(path)
    }
}

fn sanitize_name(name: &str) -> Result<String, MigrationError> {
    let cleaned: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_').to_string();
    if cleaned.is_empty() {
        Err(MigrationError::InvalidName(name.to_string()))
    } else {
        Ok(cleaned)
    }
}

/// Filesystem migrations applied to Postgres through `sqlx::migrate`.
///
/// The migrator holds a Postgres advisory lock while it runs, so concurrent
/// instances serialize on it and the later ones find nothing pending.
pub struct SqlxMigrationTool {
    dir: MigrationDir,
    pool: PgPool,
}

impl SqlxMigrationTool {
    pub fn new(dir: MigrationDir, pool: PgPool) -> Self {
        Self { dir, pool }
    }
}

#[async_trait]
impl MigrationTool for SqlxMigrationTool {
    async fn ensure_dir(&self) -> Result<(), MigrationError> {
        self.dir.ensure().await
    }

    async fn has_migrations(&self) -> Result<bool, MigrationError> {
        self.dir.has_migrations().await
    }

    async fn generate_initial(&self) -> Result<PathBuf, MigrationError> {
        self.dir.generate_initial().await
    }

    async fn upgrade(&self) -> Result<(), MigrationError> {
        let mut migrator = Migrator::new(self.dir.path().to_path_buf()).await?;
        // versions applied by an instance with its own migrations volume
        migrator.set_ignore_missing(true);
        tracing::info!(
            dir = %self.dir.path().display(),
            available = migrator.iter().count(),
            "Applying pending migrations"
        );
        migrator.run(&self.pool).await?;
        Ok(())
    }
}
