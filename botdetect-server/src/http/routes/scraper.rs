//! Hiscore scraper endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use botdetect_core::hiscore::split_records;
use botdetect_core::{ScraperRecord, ValidationError};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::db::{HiscoreRepo, Permission, PlayerRepo, ScrapeTarget};
use crate::http::auth;
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidPath};
use crate::http::server::AppState;

/// Offset of a 1-based page.
fn page_offset(page: i64, amount: i64) -> Result<i64, ValidationError> {
    if page < 1 {
        return Err(ValidationError::OutOfRange {
            field: "page",
            value: page.to_string(),
            range: ">= 1",
        });
    }
    if amount < 1 {
        return Err(ValidationError::OutOfRange {
            field: "amount",
            value: amount.to_string(),
            range: ">= 1",
        });
    }

    (page - 1)
        .checked_mul(amount)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "page",
            value: page.to_string(),
            range: "page * amount within i64",
        })
}

/// GET /scraper/players/{page}/{amount}/{token}
async fn players_to_scrape(
    State(state): State<Arc<AppState>>,
    ValidPath((page, amount, token)): ValidPath<(i64, i64, String)>,
) -> Result<Json<Vec<ScrapeTarget>>, ApiError> {
    let offset = page_offset(page, amount)?;
    auth::verify(&state.pool, &token, Permission::Ban).await?;

    let players = PlayerRepo::new(&state.pool).to_scrape(amount, offset).await?;
    Ok(Json(players))
}

/// POST /scraper/hiscores/{token}
///
/// Hiscores go in first, batch by batch with the lock-timeout retry; the
/// player rows are updated afterwards.
async fn post_hiscores(
    State(state): State<Arc<AppState>>,
    ValidPath(token): ValidPath<String>,
    ValidJson(records): ValidJson<Vec<ScraperRecord>>,
) -> Result<Json<Value>, ApiError> {
    auth::verify(&state.pool, &token, Permission::Ban).await?;

    let (players, hiscores) = split_records(records, Utc::now());
    let batch_size = state.scraper_batch_size.max(1);

    let hiscore_repo = HiscoreRepo::new(&state.pool);
    let mut inserted = 0;
    for batch in hiscores.chunks(batch_size) {
        inserted += state
            .retry
            .run("hiscore insert", || hiscore_repo.insert_batch(batch))
            .await?;
    }

    let player_repo = PlayerRepo::new(&state.pool);
    let mut updated = 0;
    for batch in players.chunks(batch_size) {
        updated += player_repo.update_batch(batch).await?;
    }

    info!(
        hiscores = hiscores.len(),
        inserted,
        players = players.len(),
        updated,
        "Scraper upload stored"
    );

    Ok(Json(json!({ "ok": "ok" })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scraper/players/{page}/{amount}/{token}", get(players_to_scrape))
        .route("/scraper/hiscores/{token}", post(post_hiscores))
}
