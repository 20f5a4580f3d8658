//! Contribution queries - reports filed by a set of contributors

use botdetect_core::ContributionRow;
use sqlx::{PgPool, Row};

use super::DbError;

/// Rows fetched per page of the contribution query
const PAGE_SIZE: i64 = 100_000;

/// Contribution repository
pub struct ContributionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ContributionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every report filed by the contributors, joined with the reported
    /// player's ban state. `contributors` are normalised names.
    ///
    /// Pages through the result until a short page comes back.
    pub async fn rows(&self, contributors: &[String]) -> Result<Vec<ContributionRow>, DbError> {
        let mut output = Vec::new();
        let mut offset = 0;

        loop {
            let rows = sqlx::query(
                r#"
                SELECT
                    COALESCE(rs.manual_detect, 0) AS detect,
                    rs.reported_id,
                    ban.confirmed_ban,
                    ban.possible_ban,
                    ban.confirmed_player
                FROM reports rs
                JOIN players pl ON pl.id = rs.reporting_id
                JOIN players ban ON ban.id = rs.reported_id
                WHERE pl.normalized_name = ANY($1)
                ORDER BY rs.id
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(contributors)
            .bind(PAGE_SIZE)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

            let fetched = rows.len() as i64;
            output.extend(rows.into_iter().map(|r| ContributionRow {
                detect: r.get("detect"),
                reported_id: r.get("reported_id"),
                confirmed_ban: r.get("confirmed_ban"),
                possible_ban: r.get("possible_ban"),
                confirmed_player: r.get("confirmed_player"),
            }));

            if fetched < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(output)
    }

    /// Prediction-feedback votes cast by the contributors.
    pub async fn feedback_count(&self, contributors: &[String]) -> Result<i64, DbError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM predictions_feedback pf
            JOIN players p ON p.id = pf.voter_id
            WHERE p.normalized_name = ANY($1)
            "#,
        )
        .bind(contributors)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Sum of the latest total level of the given players.
    pub async fn total_xp_removed(&self, banned_ids: &[i64]) -> Result<i64, DbError> {
        if banned_ids.is_empty() {
            return Ok(0);
        }

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total), 0)::BIGINT
            FROM player_hiscore_data_latest
            WHERE player_id = ANY($1)
            "#,
        )
        .bind(banned_ids)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }
}
