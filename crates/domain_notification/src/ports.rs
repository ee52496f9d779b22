//! Notification Domain Ports
//!
//! - [`UserDirectory`] resolves a platform user to their push settings
//! - [`PushSender`] delivers a prepared [`PushMessage`]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, PortError};

use crate::error::NotificationError;
use crate::message::PushMessage;

/// Push settings stored for a platform user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientProfile {
    pub user_id: String,
    /// Device registration token, absent until the app registers one
    pub push_token: Option<String>,
    pub notifications_enabled: bool,
}

impl RecipientProfile {
    pub fn new(user_id: impl Into<String>, push_token: Option<String>, notifications_enabled: bool) -> Self {
        Self {
            user_id: user_id.into(),
            push_token,
            notifications_enabled,
        }
    }

    /// The push token, if present and non-blank
    pub fn usable_token(&self) -> Option<&str> {
        self.push_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Lookup of platform users
#[async_trait]
pub trait UserDirectory: DomainPort {
    async fn recipient(&self, user_id: &str) -> Result<Option<RecipientProfile>, PortError>;
}

/// Delivery of push messages
#[async_trait]
pub trait PushSender: DomainPort {
    /// Sends the message and returns the push service's message id
    async fn send(&self, message: &PushMessage) -> Result<String, NotificationError>;
}

/// Recording push sender for service and API tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct RecordingPushSender {
        sent: Mutex<Vec<PushMessage>>,
        failure: Option<String>,
    }

    impl RecordingPushSender {
        pub fn new() -> Self {
            Self::default()
        }

        /// A sender whose every delivery fails with `reason`
        pub fn failing(reason: impl Into<String>) -> Self {
            Self {
                sent: Mutex::default(),
                failure: Some(reason.into()),
            }
        }

        pub fn sent(&self) -> Vec<PushMessage> {
            self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
        }
    }

    impl DomainPort for RecordingPushSender {}

    #[async_trait]
    impl PushSender for RecordingPushSender {
        async fn send(&self, message: &PushMessage) -> Result<String, NotificationError> {
            if let Some(reason) = &self.failure {
                return Err(NotificationError::Delivery(reason.clone()));
            }
            let mut sent = self
                .sent
                .lock()
                .map_err(|_| NotificationError::Delivery("recorder poisoned".to_string()))?;
            sent.push(message.clone());
            Ok(format!("projects/test/messages/{}", sent.len()))
        }
    }
}
