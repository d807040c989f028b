use anyhow::Context;
use clap::{Parser, Subcommand};
use lexicon::{
    bootstrap,
    config::Config,
    database, logging,
    migrations::{MigrationDir, MigrationTool, SqlxMigrationTool},
};

#[derive(Parser)]
#[command(name = "lexicon", version, about = "LexiconAI: Russian synonyms and antonyms over HTTP and Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Prepare migrations, then run the API server or the bot (per RUN_MODE)
    Serve,
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        command: MigrateCommand,
    },
}

#[derive(Subcommand)]
enum MigrateCommand {
    /// Apply all pending migrations
    Upgrade,
    /// Create an empty timestamped migration file
    Generate { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("failed to load configuration")?;
    logging::init_tracing(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => bootstrap::start(config).await,
        Command::Migrate {
            command: MigrateCommand::Upgrade,
        } => {
            let pool = database::connect(&config.database_url)
                .await
                .context("failed to connect to Postgres")?;
            let dir = MigrationDir::new(&config.migrations_dir);
            SqlxMigrationTool::new(dir, pool)
                .upgrade()
                .await
                .context("database migration failed")?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::Migrate {
            command: MigrateCommand::Generate { name },
        } => {
            let dir = MigrationDir::new(&config.migrations_dir);
            dir.ensure().await?;
            let path = dir.generate(&name).await?;
            println!("Created {}", path.display());
            Ok(())
        }
    }
}
