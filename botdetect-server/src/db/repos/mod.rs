//! Repository implementations for database access
//!
//! Each repository borrows the pool and maps rows by hand:
//! - Bulk writes go through `QueryBuilder::push_values` in a transaction
//! - Name lookups use `= ANY($1)` over normalised names (no N+1)
//! - Duplicate inserts are absorbed by `ON CONFLICT DO NOTHING`

pub mod contributions;
pub mod feedback;
pub mod hiscores;
pub mod players;
pub mod predictions;
pub mod reports;
pub mod tokens;

pub use contributions::ContributionRepo;
pub use feedback::{FeedbackRecord, FeedbackRepo, NewFeedback};
pub use hiscores::HiscoreRepo;
pub use players::{Player, PlayerRepo, ResolvedPlayers, ScrapeTarget};
pub use predictions::PredictionRepo;
pub use reports::ReportRepo;
pub use tokens::{Permission, TokenRepo};

/// SQLSTATE lock_not_available
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// SQLSTATE deadlock_detected
const DEADLOCK_DETECTED: &str = "40P01";

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("lock wait timeout: {0}")]
    LockTimeout(sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },
}

impl DbError {
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        let lock = match &e {
            sqlx::Error::Database(db) => matches!(
                db.code().as_deref(),
                Some(LOCK_NOT_AVAILABLE) | Some(DEADLOCK_DETECTED)
            ),
            _ => false,
        };

        if lock {
            Self::LockTimeout(e)
        } else {
            Self::Sqlx(e)
        }
    }
}
