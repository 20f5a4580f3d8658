//! Player repository
//!
//! Players are keyed by `normalized_name`; the submitted spelling is kept in
//! `name` for display.

use std::collections::HashMap;

use botdetect_core::hiscore::PlayerUpdate;
use botdetect_core::to_jagex_name;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Row};

use super::DbError;

/// Player record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub normalized_name: String,
    pub possible_ban: bool,
    pub confirmed_ban: bool,
    pub confirmed_player: bool,
    pub label_id: i64,
    pub label_jagex: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row of the `players_to_scrape` view
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScrapeTarget {
    pub id: i64,
    pub name: String,
    pub possible_ban: bool,
    pub confirmed_ban: bool,
    pub confirmed_player: bool,
    pub label_id: i64,
    pub label_jagex: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Outcome of resolving a set of names to ids
#[derive(Debug, Clone, Default)]
pub struct ResolvedPlayers {
    /// Normalised name to player id
    pub ids: HashMap<String, i64>,
    /// Players inserted while resolving
    pub created: u64,
}

/// Player repository
pub struct PlayerRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PlayerRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look a player up by any spelling of their name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Player>, DbError> {
        let player = sqlx::query_as::<_, Player>(
            r#"
            SELECT id, name, normalized_name, possible_ban, confirmed_ban,
                   confirmed_player, label_id, label_jagex, updated_at
            FROM players
            WHERE normalized_name = $1
            "#,
        )
        .bind(to_jagex_name(name))
        .fetch_optional(self.pool)
        .await?;

        Ok(player)
    }

    /// Fetch a player, inserting them first when unknown.
    pub async fn get_or_create(&self, name: &str) -> Result<Player, DbError> {
        sqlx::query(
            r#"
            INSERT INTO players (name, normalized_name)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(name)
        .bind(to_jagex_name(name))
        .execute(self.pool)
        .await?;

        self.get_by_name(name).await?.ok_or_else(|| DbError::NotFound {
            resource: "player",
            id: name.to_owned(),
        })
    }

    /// Display name for a player id.
    pub async fn get_name(&self, id: i64) -> Result<Option<String>, DbError> {
        let name: Option<(String,)> = sqlx::query_as("SELECT name FROM players WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(name.map(|(name,)| name))
    }

    /// Resolve normalised names to ids, inserting players that don't exist.
    ///
    /// One select, one bulk insert for the missing names, one select for
    /// the newly inserted rows.
    pub async fn resolve(&self, names: &[String]) -> Result<ResolvedPlayers, DbError> {
        let mut ids = self.ids_for(names).await?;

        let missing: Vec<String> = names
            .iter()
            .filter(|name| !ids.contains_key(*name))
            .cloned()
            .collect();

        let mut created = 0;
        if !missing.is_empty() {
            created = sqlx::query(
                r#"
                INSERT INTO players (name, normalized_name)
                SELECT n, n FROM UNNEST($1::text[]) AS n
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(&missing)
            .execute(self.pool)
            .await?
            .rows_affected();

            ids.extend(self.ids_for(&missing).await?);
        }

        Ok(ResolvedPlayers { ids, created })
    }

    async fn ids_for(&self, names: &[String]) -> Result<HashMap<String, i64>, DbError> {
        let rows = sqlx::query(
            "SELECT normalized_name, id FROM players WHERE normalized_name = ANY($1)",
        )
        .bind(names)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get("normalized_name"), r.get("id")))
            .collect())
    }

    /// Players due for a hiscore scrape, in random order.
    pub async fn to_scrape(&self, limit: i64, offset: i64) -> Result<Vec<ScrapeTarget>, DbError> {
        let rows = sqlx::query_as::<_, ScrapeTarget>(
            r#"
            SELECT id, name, possible_ban, confirmed_ban, confirmed_player,
                   label_id, label_jagex, updated_at
            FROM players_to_scrape
            ORDER BY random()
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Apply scraper updates in one transaction.
    ///
    /// Flags that the scraper left out keep their stored value.
    pub async fn update_batch(&self, updates: &[PlayerUpdate]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for update in updates {
            let player = &update.player;
            updated += sqlx::query(
                r#"
                UPDATE players SET
                    possible_ban = COALESCE($2, possible_ban),
                    confirmed_ban = COALESCE($3, confirmed_ban),
                    confirmed_player = COALESCE($4, confirmed_player),
                    label_id = COALESCE($5, label_id),
                    label_jagex = COALESCE($6, label_jagex),
                    updated_at = $7
                WHERE id = $1
                "#,
            )
            .bind(player.id)
            .bind(player.possible_ban)
            .bind(player.confirmed_ban)
            .bind(player.confirmed_player)
            .bind(player.label_id)
            .bind(player.label_jagex)
            .bind(update.updated_at)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Player id linked to a Discord account through a verified link.
    pub async fn verified_discord_player(&self, discord_id: i64) -> Result<Option<i64>, DbError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT player_id
            FROM discord_verification
            WHERE discord_id = $1 AND verified
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(discord_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }
}
