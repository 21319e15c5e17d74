use sqlx::PgPool;
use uuid::Uuid;

use crate::models::InstagramAccount;

pub async fn find_account_by_id(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Option<InstagramAccount>, sqlx::Error> {
    sqlx::query_as::<_, InstagramAccount>(
        r#"
        SELECT id, username, instagram_user_id, access_token, is_active, created_at, updated_at
        FROM instagram_accounts
        WHERE id = $1
        "#,
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await
}

/// Active account lookup for the publish path. Inactive accounts are treated
/// the same as missing ones by callers.
pub async fn find_active_account(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Option<InstagramAccount>, sqlx::Error> {
    sqlx::query_as::<_, InstagramAccount>(
        r#"
        SELECT id, username, instagram_user_id, access_token, is_active, created_at, updated_at
        FROM instagram_accounts
        WHERE id = $1 AND is_active = TRUE
        "#,
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await
}
