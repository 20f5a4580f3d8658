//! Lock-timeout retry for the hiscore insert path
//!
//! Concurrent scrapers insert into the same table and occasionally lose a
//! lock wait. The batch is retried after a uniformly random pause so that
//! colliding writers spread out.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use super::DbError;
use crate::config::ScraperSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRetry {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for LockRetry {
    fn default() -> Self {
        Self::from_settings(&ScraperSettings::default())
    }
}

impl LockRetry {
    pub fn from_settings(settings: &ScraperSettings) -> Self {
        Self {
            max_retries: settings.max_lock_retries,
            min_backoff: Duration::from_millis(settings.min_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }

    /// Random pause in `[min_backoff, max_backoff)`.
    pub fn backoff(&self) -> Duration {
        if self.min_backoff >= self.max_backoff {
            return self.min_backoff;
        }
        rand::thread_rng().gen_range(self.min_backoff..self.max_backoff)
    }

    /// Run `op`, retrying only on lock timeouts.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, DbError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(e) if e.is_lock_timeout() && attempt < self.max_retries => {
                    attempt += 1;
                    let pause = self.backoff();
                    debug!(
                        what,
                        attempt,
                        pause_ms = pause.as_millis() as u64,
                        "Lock wait timeout exceeded, retrying"
                    );
                    tokio::time::sleep(pause).await;
                }
                Err(e) => {
                    if e.is_lock_timeout() {
                        warn!(what, attempts = attempt + 1, "Giving up after lock wait timeouts");
                    }
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }
}
