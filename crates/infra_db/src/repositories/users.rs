//! Platform user repository
//!
//! Read-only access to the push settings the booking backend keeps per user.

use sqlx::PgExecutor;

use crate::error::DatabaseError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserPushRow {
    pub id: String,
    pub push_token: Option<String>,
    pub notifications_enabled: bool,
}

pub async fn fetch_push_settings<'e>(
    executor: impl PgExecutor<'e>,
    user_id: &str,
) -> Result<Option<UserPushRow>, DatabaseError> {
    Ok(sqlx::query_as::<_, UserPushRow>(
        "SELECT id, push_token, notifications_enabled FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?)
}
