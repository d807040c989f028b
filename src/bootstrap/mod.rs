//! Startup sequence run before the API server or the bot.
//!
//! 1. make sure the migrations directory exists
//! 2. primary instance with no migrations: generate the initial one
//! 3. otherwise poll for migration files written by the primary instance
//! 4. apply pending migrations, once, in every mode
//! 5. fire-and-forget startup notification to the admin chat
//! 6. launch the process selected by `RUN_MODE`

mod notify;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

pub use notify::{STARTUP_MESSAGE, StartupNotifier};

use crate::config::{Config, RunMode};
use crate::migrations::{MigrationDir, MigrationError, MigrationTool, SqlxMigrationTool};
use crate::{AppState, bot, database, server};

/// Bounded polling for migrations created by another instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub retries: u32,
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retries: config.migration_wait_retries,
            interval: config.migration_wait_interval(),
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            retries: 30,
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub generated: Option<PathBuf>,
    /// Sleeps spent waiting for another instance's migrations.
    pub polls: u32,
    pub timed_out: bool,
}

pub async fn prepare_migrations(
    tool: &dyn MigrationTool,
    mode: RunMode,
    policy: WaitPolicy,
) -> Result<MigrationReport, MigrationError> {
    tool.ensure_dir().await?;

    let mut report = MigrationReport::default();
    if mode.is_primary() && !tool.has_migrations().await? {
        tracing::info!("No migrations found, generating initial migration");
        report.generated = Some(tool.generate_initial().await?);
    } else {
        let (polls, found) = wait_for_migrations(tool, policy).await?;
        report.polls = polls;
        report.timed_out = !found;
    }

    tracing::info!(mode = mode.as_str(), "Applying database migrations");
    tool.upgrade().await?;
    Ok(report)
}

async fn wait_for_migrations(
    tool: &dyn MigrationTool,
    policy: WaitPolicy,
) -> Result<(u32, bool), MigrationError> {
    let mut polls = 0;
    while polls < policy.retries {
        if tool.has_migrations().await? {
            return Ok((polls, true));
        }
        polls += 1;
        tracing::info!(
            attempt = polls,
            retries = policy.retries,
            "Waiting for migrations from the primary instance"
        );
        tokio::time::sleep(policy.interval).await;
    }

    let found = tool.has_migrations().await?;
    if !found {
        tracing::warn!(
            retries = policy.retries,
            "No migrations appeared, continuing without them"
        );
    }
    Ok((polls, found))
}

/// Runs the whole startup sequence and then the selected long-running process.
pub async fn start(config: Config) -> anyhow::Result<()> {
    let mode = config.run_mode;
    tracing::info!(mode = mode.as_str(), env = config.app_env.as_str(), "Starting LexiconAI");

    let pool = database::connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let tool = SqlxMigrationTool::new(MigrationDir::new(&config.migrations_dir), pool.clone());
    let report = prepare_migrations(&tool, mode, WaitPolicy::from_config(&config))
        .await
        .context("database migration failed")?;
    tracing::debug!(?report, "Migrations ready");

    if let Some(notifier) = StartupNotifier::from_config(&config) {
        notifier.spawn();
    }

    let state = AppState::from_pool(config, pool).context("failed to build application state")?;
    launch(mode, state, &ProcessLauncher).await
}

/// The two long-running processes an instance can become.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn run_server(&self, state: AppState) -> anyhow::Result<()>;
    async fn run_bot(&self, state: AppState) -> anyhow::Result<()>;
}

pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn run_server(&self, state: AppState) -> anyhow::Result<()> {
        server::serve(state).await
    }

    async fn run_bot(&self, state: AppState) -> anyhow::Result<()> {
        bot::run(state).await
    }
}

pub async fn launch(mode: RunMode, state: AppState, launcher: &dyn Launcher) -> anyhow::Result<()> {
    tracing::info!(mode = mode.as_str(), "Launching process");
    match mode {
        RunMode::Bot => launcher.run_bot(state).await,
        RunMode::App => launcher.run_server(state).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    /// Records calls; migrations "appear" after a number of checks.
    struct ScriptedTool {
        calls: Mutex<Vec<&'static str>>,
        appear_after_checks: Option<u32>,
        checks: AtomicU32,
    }

    impl ScriptedTool {
        fn new(appear_after_checks: Option<u32>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                appear_after_checks,
                checks: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, name: &str) -> usize {
            self.calls().iter().filter(|c| **c == name).count()
        }
    }

    #[async_trait]
    impl MigrationTool for ScriptedTool {
        async fn ensure_dir(&self) -> Result<(), MigrationError> {
            self.calls.lock().unwrap().push("ensure_dir");
            Ok(())
        }

        async fn has_migrations(&self) -> Result<bool, MigrationError> {
            self.calls.lock().unwrap().push("has_migrations");
            let seen = self.checks.fetch_add(1, Ordering::SeqCst);
            Ok(self.appear_after_checks.is_some_and(|n| seen >= n))
        }

        async fn generate_initial(&self) -> Result<PathBuf, MigrationError> {
            self.calls.lock().unwrap().push("generate_initial");
            Ok(PathBuf::from("migrations/20240101000000_initial.sql"))
        }

        async fn upgrade(&self) -> Result<(), MigrationError> {
            self.calls.lock().unwrap().push("upgrade");
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn primary_generates_before_upgrading() {
        let tool = ScriptedTool::new(None);
        let started = tokio::time::Instant::now();

        let report = prepare_migrations(&tool, RunMode::App, WaitPolicy::default())
            .await
            .unwrap();

        assert_eq!(
            tool.calls(),
            vec!["ensure_dir", "has_migrations", "generate_initial", "upgrade"]
        );
        assert!(report.generated.is_some());
        assert_eq!(report.polls, 0);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn secondary_polls_full_window_and_never_generates() {
        let tool = ScriptedTool::new(None);
        let started = tokio::time::Instant::now();

        let report = prepare_migrations(&tool, RunMode::Bot, WaitPolicy::default())
            .await
            .unwrap();

        assert_eq!(report.polls, 30);
        assert!(report.timed_out);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
        assert_eq!(tool.count("generate_initial"), 0);
        assert_eq!(tool.count("upgrade"), 1);
        assert_eq!(tool.calls().last(), Some(&"upgrade"));
    }

    #[tokio::test(start_paused = true)]
    async fn secondary_stops_polling_once_migrations_appear() {
        let tool = ScriptedTool::new(Some(3));
        let started = tokio::time::Instant::now();

        let report = prepare_migrations(&tool, RunMode::Bot, WaitPolicy::default())
            .await
            .unwrap();

        assert_eq!(report.polls, 3);
        assert!(!report.timed_out);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
        assert_eq!(tool.count("upgrade"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn primary_with_existing_migrations_only_upgrades() {
        let tool = ScriptedTool::new(Some(0));

        let report = prepare_migrations(&tool, RunMode::App, WaitPolicy::default())
            .await
            .unwrap();

        assert_eq!(report, MigrationReport::default());
        assert_eq!(tool.count("generate_initial"), 0);
        assert_eq!(tool.count("upgrade"), 1);
    }

    #[tokio::test]
    async fn filesystem_primary_writes_initial_migration() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = MigrationDir::new(tmp.path().join("migrations"));

        // stands in for the Postgres-backed tool; upgrade is a no-op here
        struct DirOnly(MigrationDir, AtomicU32);

        #[async_trait]
        impl MigrationTool for DirOnly {
            async fn ensure_dir(&self) -> Result<(), MigrationError> {
                self.0.ensure().await
            }
            async fn has_migrations(&self) -> Result<bool, MigrationError> {
                self.0.has_migrations().await
            }
            async fn generate_initial(&self) -> Result<PathBuf, MigrationError> {
                self.0.generate_initial().await
            }
            async fn upgrade(&self) -> Result<(), MigrationError> {
                self.1.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let tool = DirOnly(dir.clone(), AtomicU32::new(0));
        let report = prepare_migrations(&tool, RunMode::App, WaitPolicy::default())
            .await
            .unwrap();

        assert!(report.generated.unwrap().exists());
        assert!(dir.has_migrations().await.unwrap());
        assert_eq!(tool.1.load(Ordering::SeqCst), 1);
    }

    #[derive(Default)]
    struct RecordingLauncher {
        launched: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl Launcher for RecordingLauncher {
        async fn run_server(&self, _: AppState) -> anyhow::Result<()> {
            self.launched.lock().unwrap().push("server");
            Ok(())
        }

        async fn run_bot(&self, _: AppState) -> anyhow::Result<()> {
            self.launched.lock().unwrap().push("bot");
            Ok(())
        }
    }

    #[tokio::test]
    async fn run_mode_selects_the_process() {
        use crate::testing::{FakeAnalyzer, test_app};

        let launcher = RecordingLauncher::default();
        let state = test_app(FakeAnalyzer::returning(vec![])).state;

        launch(RunMode::Bot, state.clone(), &launcher).await.unwrap();
        launch(RunMode::App, state, &launcher).await.unwrap();

        assert_eq!(*launcher.launched.lock().unwrap(), vec!["bot", "server"]);
    }
}
