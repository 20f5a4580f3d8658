//! Precomputed predictions

use std::collections::BTreeMap;

use botdetect_core::{to_jagex_name, Prediction};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use super::DbError;

#[derive(Debug, FromRow)]
struct PredictionRow {
    player_id: i64,
    name: String,
    prediction: String,
    confidence: f64,
    breakdown: Json<BTreeMap<String, f64>>,
}

impl From<PredictionRow> for Prediction {
    fn from(row: PredictionRow) -> Self {
        Prediction {
            player_id: row.player_id,
            player_name: row.name,
            prediction_label: row.prediction,
            prediction_confidence: row.confidence,
            breakdown: row.breakdown.0,
        }
    }
}

/// Prediction repository
pub struct PredictionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PredictionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Latest stored prediction for a player, by any spelling of the name.
    pub async fn get(&self, name: &str) -> Result<Option<Prediction>, DbError> {
        let row = sqlx::query_as::<_, PredictionRow>(
            r#"
            SELECT pr.player_id, pl.name, pr.prediction, pr.confidence, pr.breakdown
            FROM predictions pr
            JOIN players pl ON pl.id = pr.player_id
            WHERE pl.normalized_name = $1
            ORDER BY pr.created_at DESC, pr.id DESC
            LIMIT 1
            "#,
        )
        .bind(to_jagex_name(name))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Prediction::from))
    }

    /// Store a prediction; rows normally come from the model pipeline.
    #[cfg(test)]
    pub async fn insert(&self, prediction: &Prediction) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO predictions (player_id, prediction, confidence, breakdown)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(prediction.player_id)
        .bind(&prediction.prediction_label)
        .bind(prediction.prediction_confidence)
        .bind(Json(&prediction.breakdown))
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
