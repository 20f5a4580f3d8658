//! Database layer - connection pool and repositories
//!
//! The schema is external to the service; `migrations/` carries a copy for
//! development and tests. Inserts that the legacy MySQL tables treated as
//! "insert ignore" use `ON CONFLICT DO NOTHING`.

pub mod pool;
pub mod repos;
pub mod retry;

pub use pool::{create_lazy_pool, create_pool, run_migrations, MIGRATOR};
pub use repos::*;
pub use retry::LockRetry;
