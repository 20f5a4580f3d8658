//! Prediction feedback repository

use botdetect_core::FeedbackFilter;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::DbError;

/// Upper bound on rows returned by a feedback listing
const LIST_LIMIT: i64 = 100_000;

/// Feedback row to insert
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub voter_id: i64,
    pub subject_id: i64,
    pub vote: i64,
    pub prediction: String,
    pub confidence: f64,
    pub feedback_text: Option<String>,
    pub proposed_label: Option<String>,
}

/// Feedback record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub voter_id: i64,
    pub subject_id: i64,
    pub prediction: String,
    pub confidence: f64,
    pub vote: i64,
    pub feedback_text: Option<String>,
    pub proposed_label: Option<String>,
    pub reviewed: bool,
}

/// Feedback repository
pub struct FeedbackRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> FeedbackRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a vote. A repeated vote on the same subject and prediction is
    /// ignored; returns whether a row was written.
    pub async fn insert(&self, feedback: &NewFeedback) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO predictions_feedback
                (voter_id, subject_id, vote, prediction, confidence, feedback_text, proposed_label)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(feedback.voter_id)
        .bind(feedback.subject_id)
        .bind(feedback.vote)
        .bind(&feedback.prediction)
        .bind(feedback.confidence)
        .bind(feedback.feedback_text.as_deref())
        .bind(feedback.proposed_label.as_deref())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Feedback rows matching every filter that is set.
    pub async fn list(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>, DbError> {
        let mut builder = list_query(filter);
        let rows = builder
            .build_query_as::<FeedbackRecord>()
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }
}

fn list_query(filter: &FeedbackFilter) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT id, ts, voter_id, subject_id, prediction, confidence, vote, \
         feedback_text, proposed_label, reviewed \
         FROM predictions_feedback WHERE 1=1",
    );

    if let Some(voter_id) = filter.voter_id {
        builder.push(" AND voter_id = ").push_bind(voter_id);
    }
    if let Some(subject_id) = filter.subject_id {
        builder.push(" AND subject_id = ").push_bind(subject_id);
    }
    if let Some(vote) = filter.vote {
        builder.push(" AND vote = ").push_bind(i64::from(vote));
    }
    if let Some(prediction) = &filter.prediction {
        builder.push(" AND prediction = ").push_bind(prediction);
    }
    if let Some(confidence) = filter.confidence {
        builder.push(" AND confidence = ").push_bind(confidence.value());
    }
    if let Some(text) = &filter.feedback_text {
        builder.push(" AND feedback_text = ").push_bind(text);
    }

    builder.push(" ORDER BY id LIMIT ").push_bind(LIST_LIMIT);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use botdetect_core::Vote;

    #[test]
    fn empty_filter_has_no_conditions() {
        let filter = FeedbackFilter::default();
        let builder = list_query(&filter);
        assert!(builder.sql().ends_with("WHERE 1=1 ORDER BY id LIMIT $1"));
    }

    #[test]
    fn filters_bind_in_order() {
        let filter = FeedbackFilter {
            voter_id: Some(8),
            vote: Some(Vote::CORRECT),
            prediction: Some("Real_Player".into()),
            ..FeedbackFilter::default()
        };
        let builder = list_query(&filter);
        let sql = builder.sql();
        assert!(sql.contains("AND voter_id = $1"));
        assert!(sql.contains("AND vote = $2"));
        assert!(sql.contains("AND prediction = $3"));
        assert!(sql.ends_with("LIMIT $4"));
    }
}
