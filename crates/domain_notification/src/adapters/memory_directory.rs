//! In-memory user directory

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use core_kernel::{DomainPort, PortError};

use crate::ports::{RecipientProfile, UserDirectory};

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    profiles: RwLock<HashMap<String, RecipientProfile>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_profiles(profiles: Vec<RecipientProfile>) -> Self {
        let directory = Self::new();
        for profile in profiles {
            directory.upsert(profile).await;
        }
        directory
    }

    pub async fn upsert(&self, profile: RecipientProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

impl DomainPort for InMemoryUserDirectory {}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn recipient(&self, user_id: &str) -> Result<Option<RecipientProfile>, PortError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}
