//! Prediction feedback: plugin and Discord votes, and the review listing

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use botdetect_core::{
    Confidence, DiscordFeedback, FeedbackEmbed, FeedbackFilter, FeedbackSubmission, Vote,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::db::{FeedbackRecord, FeedbackRepo, NewFeedback, Permission, PlayerRepo};
use crate::http::auth;
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidQuery};
use crate::http::server::AppState;

const LINK_REQUIRED: &str =
    "Use the !link command to link a Runescape account to your discord account first.";

/// Query string of the feedback listing
#[derive(Debug, Deserialize)]
pub struct FeedbackQuery {
    pub token: Option<String>,
    pub voter_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub vote: Option<Vote>,
    pub prediction: Option<String>,
    pub confidence: Option<Confidence>,
    pub feedback_text: Option<String>,
}

impl FeedbackQuery {
    fn into_parts(self) -> (Option<String>, FeedbackFilter) {
        let filter = FeedbackFilter {
            voter_id: self.voter_id,
            subject_id: self.subject_id,
            vote: self.vote,
            prediction: self.prediction,
            confidence: self.confidence,
            feedback_text: self.feedback_text,
        };
        (self.token, filter)
    }
}

/// POST /plugin/predictionfeedback/ and /{version}/plugin/predictionfeedback/
async fn plugin_feedback(
    State(state): State<Arc<AppState>>,
    ValidJson(submission): ValidJson<FeedbackSubmission>,
) -> Result<Json<Value>, ApiError> {
    let voter = PlayerRepo::new(&state.pool)
        .get_or_create(&submission.player_name)
        .await?;

    let stored = FeedbackRepo::new(&state.pool)
        .insert(&NewFeedback {
            voter_id: voter.id,
            subject_id: submission.subject_id,
            vote: i64::from(submission.vote),
            prediction: submission.prediction.clone(),
            confidence: submission.confidence.value(),
            feedback_text: submission.feedback_text.clone(),
            proposed_label: submission.proposed_label.clone(),
        })
        .await?;
    info!(
        voter_id = voter.id,
        subject_id = submission.subject_id,
        vote = submission.vote.value(),
        stored,
        "Plugin feedback received"
    );

    if submission.feedback_text.is_some() {
        broadcast(&state, &submission).await;
    }

    Ok(Json(json!({ "OK": "OK" })))
}

/// Announce a submission on Discord. Failures are only logged.
async fn broadcast(state: &AppState, submission: &FeedbackSubmission) {
    let subject = match PlayerRepo::new(&state.pool).get_name(submission.subject_id).await {
        Ok(Some(name)) => name,
        Ok(None) => submission.subject_id.to_string(),
        Err(e) => {
            warn!("Subject lookup for feedback broadcast failed: {}", e);
            submission.subject_id.to_string()
        }
    };

    let embed = FeedbackEmbed::new(submission, &subject, Utc::now());
    if let Err(e) = state.webhook.broadcast(embed).await {
        warn!("Feedback broadcast failed: {}", e);
    }
}

/// POST /discord/predictionfeedback/
async fn discord_feedback(
    State(state): State<Arc<AppState>>,
    ValidJson(feedback): ValidJson<DiscordFeedback>,
) -> Result<&'static str, ApiError> {
    let players = PlayerRepo::new(&state.pool);

    let voter_id = players
        .verified_discord_player(feedback.discord_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest {
            message: LINK_REQUIRED.to_owned(),
        })?;

    let subject = players
        .get_by_name(&feedback.name)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "player",
            id: feedback.name.clone(),
        })?;

    FeedbackRepo::new(&state.pool)
        .insert(&NewFeedback {
            voter_id,
            subject_id: subject.id,
            vote: i64::from(feedback.vote),
            prediction: feedback.prediction,
            confidence: feedback.confidence.value(),
            feedback_text: feedback.feedback_text,
            proposed_label: feedback.proposed_label,
        })
        .await?;
    info!(voter_id, subject_id = subject.id, "Discord feedback received");

    Ok("OK")
}

/// GET /{version}/feedback/
async fn list_feedback(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<FeedbackQuery>,
) -> Result<Json<Vec<FeedbackRecord>>, ApiError> {
    let (token, filter) = query.into_parts();
    auth::verify(&state.pool, token.as_deref().unwrap_or_default(), Permission::VerifyBan).await?;

    let records = FeedbackRepo::new(&state.pool).list(&filter).await?;
    Ok(Json(records))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plugin/predictionfeedback/", post(plugin_feedback))
        .route("/{version}/plugin/predictionfeedback/", post(plugin_feedback))
        .route("/discord/predictionfeedback/", post(discord_feedback))
        .route("/{version}/feedback/", get(list_feedback))
}
