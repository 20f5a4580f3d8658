//! Hiscore repository

use botdetect_core::Hiscore;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::DbError;

/// Hiscore repository
pub struct HiscoreRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> HiscoreRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert one batch of snapshots, ignoring duplicates for the same day.
    ///
    /// Callers keep batches at `HISCORE_BATCH_SIZE` or below so the statement
    /// stays within the bind-parameter limit.
    pub async fn insert_batch(&self, hiscores: &[Hiscore]) -> Result<u64, DbError> {
        if hiscores.is_empty() {
            return Ok(0);
        }

        let mut builder = insert_statement(hiscores);
        let result = builder.build().execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn insert_statement(hiscores: &[Hiscore]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO player_hiscore_data ({}) ",
        Hiscore::COLUMNS.join(", ")
    ));
    builder.push_values(hiscores, |mut b, hiscore| {
        for value in hiscore.values() {
            b.push_bind(value);
        }
    });
    builder.push(" ON CONFLICT DO NOTHING");
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hiscore(player_id: i64) -> Hiscore {
        let mut value = serde_json::Map::new();
        value.insert("Player_id".into(), player_id.into());
        let skills = [
            "Attack", "Defence", "Strength", "Hitpoints", "Ranged", "Prayer", "Magic",
            "Cooking", "Woodcutting", "Fletching", "Fishing", "Firemaking", "Crafting",
            "Smithing", "Mining", "Herblore", "Agility", "Thieving", "Slayer", "Farming",
            "Runecraft", "Hunter", "Construction",
        ];
        for column in Hiscore::COLUMNS.iter().skip(1) {
            let key = skills
                .iter()
                .find(|s| s.eq_ignore_ascii_case(column))
                .map(|s| s.to_string())
                .unwrap_or_else(|| column.to_string());
            value.insert(key, 1.into());
        }
        serde_json::from_value(serde_json::Value::Object(value)).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn blocked_insert_retries_then_gives_up() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::time::Duration;

        use crate::config::DatabaseSettings;
        use crate::db::{create_pool, run_migrations, LockRetry, PlayerRepo};

        let pool = create_pool(&DatabaseSettings {
            url: std::env::var("DATABASE_URL").expect("DATABASE_URL required"),
            lock_timeout_ms: 200,
            ..DatabaseSettings::default()
        })
        .await
        .expect("pool creation failed");
        run_migrations(&pool).await.expect("migrations failed");

        let player = PlayerRepo::new(&pool)
            .get_or_create(&format!("lock {}", std::process::id() % 100_000))
            .await
            .unwrap();

        // Uncommitted row for the same (player_id, ts_date) holds the unique key
        let mut holder = pool.begin().await.unwrap();
        sqlx::query("INSERT INTO player_hiscore_data (player_id) VALUES ($1)")
            .bind(player.id)
            .execute(&mut *holder)
            .await
            .unwrap();

        let retry = LockRetry {
            max_retries: 2,
            min_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(20),
        };
        let attempts = AtomicU32::new(0);
        let repo = HiscoreRepo::new(&pool);
        let batch = [hiscore(player.id)];
        let result = retry
            .run("hiscore insert", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                repo.insert_batch(&batch)
            })
            .await;

        holder.rollback().await.unwrap();

        assert!(result.unwrap_err().is_lock_timeout());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn statement_lists_every_column() {
        let builder = insert_statement(&[hiscore(1), hiscore(2)]);
        let sql = builder.sql();
        assert!(sql.starts_with("INSERT INTO player_hiscore_data (player_id, total, attack,"));
        assert!(sql.contains(&format!("${}", Hiscore::COLUMNS.len() * 2)));
        assert!(sql.ends_with("ON CONFLICT DO NOTHING"));
    }
}
