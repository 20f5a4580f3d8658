//! API token checks

use sqlx::PgPool;

use super::error::ApiError;
use crate::db::{Permission, TokenRepo};

/// Require `token` to carry `permission`.
pub async fn verify(pool: &PgPool, token: &str, permission: Permission) -> Result<(), ApiError> {
    if token.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    if TokenRepo::new(pool).has_permission(token, permission).await? {
        Ok(())
    } else {
        tracing::warn!(permission = permission.column(), "Token rejected");
        Err(ApiError::Unauthorized)
    }
}

/// Whether `token` exists, with any permissions.
pub async fn is_known(pool: &PgPool, token: &str) -> bool {
    match TokenRepo::new(pool).exists(token).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!("Token lookup failed: {}", e);
            false
        }
    }
}
