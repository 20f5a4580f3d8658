//! Apply the bundled schema migrations

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use botdetect_server::db::{create_pool, run_migrations, MIGRATOR};

use crate::config::load_settings;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// List bundled migrations without touching the database
    #[arg(long)]
    pub list: bool,

    /// Read this file instead of the default search paths
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    if args.list {
        for migration in MIGRATOR.iter() {
            println!("{:>4}  {}", migration.version, migration.description);
        }
        return Ok(());
    }

    let mut settings = load_settings(args.config)?;
    if let Some(url) = args.database_url {
        settings.database.url = url;
    }

    let pool = create_pool(&settings.database)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to apply migrations")?;

    tracing::info!(count = MIGRATOR.iter().count(), "Migrations up to date");
    Ok(())
}
