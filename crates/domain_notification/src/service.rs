//! Push notification workflow

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::NotificationError;
use crate::message::{PushMessage, SendNotification};
use crate::ports::{PushSender, UserDirectory};

/// Result of a send attempt that reached the recipient's settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered {
        message_id: String,
        recipient_id: String,
        kind: String,
    },
    /// The recipient switched notifications off; nothing was sent
    Disabled { recipient_id: String },
}

/// Sends staff-authored push notifications to platform users
pub struct NotificationService {
    directory: Arc<dyn UserDirectory>,
    sender: Arc<dyn PushSender>,
}

impl NotificationService {
    pub fn new(directory: Arc<dyn UserDirectory>, sender: Arc<dyn PushSender>) -> Self {
        Self { directory, sender }
    }

    pub async fn send(&self, request: SendNotification) -> Result<SendOutcome, NotificationError> {
        request.validate()?;

        let profile = self
            .directory
            .recipient(&request.recipient_id)
            .await?
            .ok_or_else(|| NotificationError::UnknownRecipient(request.recipient_id.clone()))?;

        if !profile.notifications_enabled {
            info!(recipient_id = %request.recipient_id, "Recipient has notifications disabled");
            return Ok(SendOutcome::Disabled {
                recipient_id: request.recipient_id,
            });
        }

        let token = profile
            .usable_token()
            .ok_or_else(|| NotificationError::MissingPushToken(request.recipient_id.clone()))?;

        let message = PushMessage {
            token: token.to_string(),
            title: request.title.clone(),
            body: request.body.clone(),
            data: request.push_data(),
        };

        let message_id = self.sender.send(&message).await.map_err(|err| {
            warn!(recipient_id = %request.recipient_id, kind = %request.kind, error = %err, "Push delivery failed");
            err
        })?;

        info!(
            recipient_id = %request.recipient_id,
            kind = %request.kind,
            message_id = %message_id,
            "Push notification sent"
        );
        Ok(SendOutcome::Delivered {
            message_id,
            recipient_id: request.recipient_id,
            kind: request.kind,
        })
    }
}
