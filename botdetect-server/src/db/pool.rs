//! Database connection pool management

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::DatabaseSettings;

/// Bundled schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connection options for `settings`.
///
/// Every session gets `lock_timeout` so that a blocked insert fails with
/// SQLSTATE 55P03 instead of waiting forever. `0` leaves the server default.
pub fn connect_options(settings: &DatabaseSettings) -> Result<PgConnectOptions, sqlx::Error> {
    let options: PgConnectOptions = settings.url.parse()?;
    if settings.lock_timeout_ms == 0 {
        return Ok(options);
    }
    Ok(options.options([("lock_timeout", format!("{}ms", settings.lock_timeout_ms))]))
}

/// Create a PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the first connection fails.
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(connect_options(settings)?)
        .await
}

/// Pool that connects on first use. Handlers that never reach the database
/// can be exercised without one.
pub fn create_lazy_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    Ok(PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_lazy_with(connect_options(settings)?))
}

/// Apply bundled migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
