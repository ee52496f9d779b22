//! Notification DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use domain_notification::{SendNotification, SendOutcome};

/// Missing fields deserialize as empty so the service can name all of them
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendNotificationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub recipient_id: String,
    pub title: String,
    pub body: String,
    pub data: Map<String, Value>,
}

impl From<SendNotificationRequest> for SendNotification {
    fn from(request: SendNotificationRequest) -> Self {
        SendNotification {
            kind: request.kind,
            recipient_id: request.recipient_id,
            title: request.title,
            body: request.body,
            data: request.data,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub recipient_id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<SendOutcome> for SendNotificationResponse {
    fn from(outcome: SendOutcome) -> Self {
        match outcome {
            SendOutcome::Delivered {
                message_id,
                recipient_id,
                kind,
            } => Self {
                success: true,
                message_id: Some(message_id),
                recipient_id,
                kind: Some(kind),
                message: None,
            },
            SendOutcome::Disabled { recipient_id } => Self {
                success: false,
                message_id: None,
                recipient_id,
                kind: None,
                message: Some("User has disabled notifications".to_string()),
            },
        }
    }
}
