//! Quiz Service - operator CLI for the quiz data-access layer.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_service_lib::commands;
use quiz_service_lib::{MigrateAction, PurgeTarget};

#[derive(Parser)]
#[command(name = "quiz-service")]
#[command(about = "Quiz storage and cache maintenance")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// Cache maintenance commands
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
    /// Print quiz counts read from the database
    Stats {
        /// Also report the count and max order of one quiz set
        #[arg(long)]
        quiz_set: Option<i64>,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Drop cached list pages of a quiz set, or everything with --all
    Purge {
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        quiz_set: Option<i64>,
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            commands::run_migrations(migrate_action).await?;
        }
        Commands::Cache {
            action: CacheCommands::Purge { quiz_set, all },
        } => {
            let target = match quiz_set {
                Some(quiz_set_id) if !all => PurgeTarget::QuizSet(quiz_set_id),
                _ => PurgeTarget::All,
            };
            commands::run_cache_purge(target).await?;
        }
        Commands::Stats { quiz_set } => {
            commands::run_stats(quiz_set).await?;
        }
    }

    Ok(())
}
