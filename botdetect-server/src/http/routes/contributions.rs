//! Contributor statistics

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use botdetect_core::contributions::banned_reported_ids;
use botdetect_core::{to_jagex_name, Contributions, ContributionsResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use crate::db::{ContributionRepo, Permission, PlayerRepo};
use crate::http::auth;
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct Contributor {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContributorId {
    pub id: i64,
}

/// Aggregate stats for a set of contributor names.
///
/// `patron` adds the hiscore total of every banned player they reported.
async fn contributions(
    pool: &PgPool,
    names: &[String],
    version: Option<&str>,
    patron: bool,
) -> Result<ContributionsResponse, ApiError> {
    let contributors: Vec<String> = names.iter().map(|n| to_jagex_name(n)).collect();
    let repo = ContributionRepo::new(pool);

    let rows = repo.rows(&contributors).await?;
    let feedback = repo.feedback_count(&contributors).await?;
    debug!(contributors = contributors.len(), rows = rows.len(), "Contribution rows fetched");

    let mut stats = Contributions::aggregate(&rows, feedback);
    if patron {
        let banned = banned_reported_ids(&rows);
        stats.total.total_xp_removed = Some(repo.total_xp_removed(&banned).await?);
    }

    Ok(stats.into_response(version))
}

/// POST /stats/contributions/
async fn post_contributions(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<TokenQuery>,
    ValidJson(contributors): ValidJson<Vec<Contributor>>,
) -> Result<Json<ContributionsResponse>, ApiError> {
    // A token is optional, but one that is sent must verify
    let patron = match query.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => {
            auth::verify(&state.pool, token, Permission::VerifyPlayers).await?;
            true
        }
        None => false,
    };
    let names: Vec<String> = contributors.into_iter().map(|c| c.name).collect();

    Ok(Json(contributions(&state.pool, &names, None, patron).await?))
}

/// GET /{version}/stats/contributions/{contributor}
async fn get_contributions(
    State(state): State<Arc<AppState>>,
    ValidPath((version, contributor)): ValidPath<(String, String)>,
) -> Result<Json<ContributionsResponse>, ApiError> {
    let response = contributions(&state.pool, &[contributor], Some(version.as_str()), false).await?;
    Ok(Json(response))
}

/// GET /stats/getcontributorid/{contributor}
async fn contributor_id(
    State(state): State<Arc<AppState>>,
    ValidPath(contributor): ValidPath<String>,
) -> Result<Json<ContributorId>, ApiError> {
    let player = PlayerRepo::new(&state.pool)
        .get_by_name(&contributor)
        .await?
        .ok_or(ApiError::NotFound {
            resource: "contributor",
            id: contributor,
        })?;

    Ok(Json(ContributorId { id: player.id }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats/contributions/", post(post_contributions))
        .route("/{version}/stats/contributions/{contributor}", get(get_contributions))
        .route("/stats/getcontributorid/{contributor}", get(contributor_id))
}
