//! PostgreSQL user directory

use async_trait::async_trait;
use sqlx::PgPool;

use core_kernel::{DomainPort, PortError};
use domain_notification::{RecipientProfile, UserDirectory};

use crate::repositories::users;

/// Reads push settings from the `users` table
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresUserDirectory {}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn recipient(&self, user_id: &str) -> Result<Option<RecipientProfile>, PortError> {
        let row = users::fetch_push_settings(&self.pool, user_id).await?;
        Ok(row.map(|row| RecipientProfile::new(row.id, row.push_token, row.notifications_enabled)))
    }
}
