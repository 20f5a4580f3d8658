//! API token lookups

use sqlx::PgPool;

use super::DbError;

/// Permission flags carried by an `api_tokens` row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    RequestHighscores,
    VerifyBan,
    CreateToken,
    VerifyPlayers,
    Ban,
}

impl Permission {
    /// Column holding the flag. Only ever interpolated from this fixed set.
    pub fn column(self) -> &'static str {
        match self {
            Self::RequestHighscores => "request_highscores",
            Self::VerifyBan => "verify_ban",
            Self::CreateToken => "create_token",
            Self::VerifyPlayers => "verify_players",
            Self::Ban => "ban",
        }
    }
}

/// Token repository
pub struct TokenRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether `token` exists and carries `permission`.
    pub async fn has_permission(&self, token: &str, permission: Permission) -> Result<bool, DbError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM api_tokens WHERE token = $1 AND {})",
            permission.column()
        );
        let (allowed,): (bool,) = sqlx::query_as(&sql)
            .bind(token)
            .fetch_one(self.pool)
            .await?;

        Ok(allowed)
    }

    /// Whether `token` exists at all.
    pub async fn exists(&self, token: &str) -> Result<bool, DbError> {
        let (found,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM api_tokens WHERE token = $1)")
                .bind(token)
                .fetch_one(self.pool)
                .await?;

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_distinct() {
        let all = [
            Permission::RequestHighscores,
            Permission::VerifyBan,
            Permission::CreateToken,
            Permission::VerifyPlayers,
            Permission::Ban,
        ];
        let mut columns: Vec<_> = all.iter().map(|p| p.column()).collect();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), all.len());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn token_permissions() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = PgPool::connect(&url).await.expect("pool creation failed");
        crate::db::run_migrations(&pool).await.expect("migrations failed");

        let token = uuid::Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO api_tokens (token, ban) VALUES ($1, TRUE)")
            .bind(&token)
            .execute(&pool)
            .await
            .unwrap();

        let repo = TokenRepo::new(&pool);
        assert!(repo.exists(&token).await.unwrap());
        assert!(repo.has_permission(&token, Permission::Ban).await.unwrap());
        assert!(!repo.has_permission(&token, Permission::VerifyBan).await.unwrap());
        assert!(!repo.exists("no-such-token").await.unwrap());
    }
}
