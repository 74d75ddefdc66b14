use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use stockroom_api::{
    db::{self, DbConfig},
    migrator::Migrator,
};

/// Applies or reverts the embedded schema migrations
#[derive(Debug, Parser)]
#[command(name = "migration", version)]
struct Cli {
    /// Target database, e.g. `sqlite://stockroom.db?mode=rwc`
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://stockroom.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations (default)
    Up {
        /// Apply at most this many
        #[arg(short, long)]
        num: Option<u32>,
    },
    /// Revert applied migrations
    Down {
        /// Revert this many, newest first
        #[arg(short, long, default_value_t = 1)]
        num: u32,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and reapply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    info!("Connecting to database: {}", cli.database_url);

    let pool = db::establish_connection_with_config(&DbConfig {
        url: cli.database_url.clone(),
        max_connections: 2,
        ..Default::default()
    })
    .await
    .context("failed to connect to the database")?;

    match cli.command.unwrap_or(Command::Up { num: None }) {
        Command::Up { num } => {
            Migrator::up(&pool, num).await.context("migration failed")?;
            info!("Migrations applied");
        }
        Command::Down { num } => {
            Migrator::down(&pool, Some(num))
                .await
                .context("rollback failed")?;
            info!("Reverted {} migration(s)", num);
        }
        Command::Status => {
            Migrator::status(&pool)
                .await
                .context("failed to read migration status")?;
        }
        Command::Fresh => {
            Migrator::fresh(&pool).await.context("fresh migration failed")?;
            info!("Schema recreated");
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
