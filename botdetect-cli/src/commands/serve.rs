//! Run the bot detector HTTP API

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use botdetect_server::db::{create_pool, run_migrations};
use botdetect_server::{run_server, Settings};

use crate::config::load_settings;

/// Arguments for the serve command. Flags override config files and env.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Only accept browser origins on localhost
    #[arg(long)]
    pub cors_restricted: bool,

    /// Detection worker tasks
    #[arg(long)]
    pub workers: Option<usize>,

    /// Apply bundled migrations before serving
    #[arg(long)]
    pub migrate: bool,

    /// Read this file instead of the default search paths
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

impl ServeArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(bind) = self.bind {
            settings.server.bind_addr = bind;
        }
        if let Some(url) = self.database_url {
            settings.database.url = url;
        }
        if self.cors_restricted {
            settings.server.cors_permissive = false;
        }
        if let Some(workers) = self.workers {
            settings.detections.workers = workers;
        }
        if self.migrate {
            settings.database.run_migrations = true;
        }
    }
}

pub async fn run_serve(mut args: ServeArgs) -> Result<()> {
    let mut settings = load_settings(args.config.take())?;
    args.apply(&mut settings);
    settings.validate().context("Invalid configuration")?;

    tracing::info!(
        workers = settings.detections.workers,
        queue_capacity = settings.detections.queue_capacity,
        "Starting bot detector API on {}",
        settings.server.bind_addr
    );

    let pool = create_pool(&settings.database)
        .await
        .context("Failed to create database pool")?;

    if settings.database.run_migrations {
        run_migrations(&pool)
            .await
            .context("Failed to apply migrations")?;
        tracing::info!("Migrations applied");
    }

    run_server(settings, pool).await.context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let args = ServeArgs::parse_from([
            "serve",
            "--bind",
            "0.0.0.0:8080",
            "--database-url",
            "postgres://bot@db/playerdata",
            "--cors-restricted",
            "--workers",
            "2",
            "--migrate",
        ]);

        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.server.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.database.url, "postgres://bot@db/playerdata");
        assert!(!settings.server.cors_permissive);
        assert_eq!(settings.detections.workers, 2);
        assert!(settings.database.run_migrations);
    }

    #[test]
    fn absent_flags_keep_settings() {
        let args = ServeArgs {
            bind: None,
            database_url: None,
            cors_restricted: false,
            workers: None,
            migrate: false,
            config: None,
        };

        let mut settings = Settings::default();
        let before = settings.clone();
        args.apply(&mut settings);

        assert_eq!(settings.server.bind_addr, before.server.bind_addr);
        assert_eq!(settings.database.url, before.database.url);
        assert!(settings.server.cors_permissive);
        assert_eq!(settings.detections.workers, before.detections.workers);
    }
}
