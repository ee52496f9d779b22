//! Notification domain errors

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur sending a push notification
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid notification: {0}")]
    InvalidRequest(String),

    #[error("Recipient user not found: {0}")]
    UnknownRecipient(String),

    #[error("Recipient {0} has no push token")]
    MissingPushToken(String),

    #[error("Push service is not configured: {0}")]
    SenderMisconfigured(String),

    #[error("Push delivery failed: {0}")]
    Delivery(String),

    #[error("User directory error: {0}")]
    Directory(#[from] PortError),
}

impl NotificationError {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationError::InvalidRequest(_) => "invalid_request",
            NotificationError::UnknownRecipient(_) => "unknown_recipient",
            NotificationError::MissingPushToken(_) => "missing_push_token",
            NotificationError::SenderMisconfigured(_) => "push_misconfigured",
            NotificationError::Delivery(_) => "push_delivery_failed",
            NotificationError::Directory(_) => "directory_error",
        }
    }
}
