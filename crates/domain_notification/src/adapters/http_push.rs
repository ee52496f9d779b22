//! HTTP push adapter
//!
//! Posts messages to an FCM-style HTTP v1 `messages:send` endpoint:
//!
//! ```json
//! { "message": { "token": "...", "notification": { "title": "...", "body": "..." },
//!                "data": { "type": "booking", ... },
//!                "android": { "priority": "high",
//!                             "notification": { "sound": "default", "channel_id": "marhabten_notifications" } },
//!                "apns": { "payload": { "aps": { "sound": "default", "badge": 1 } } } } }
//! ```
//!
//! The response's `name` is the message id.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use core_kernel::DomainPort;

use crate::error::NotificationError;
use crate::message::{PushMessage, ANDROID_CHANNEL_ID};
use crate::ports::PushSender;

/// Endpoint and credentials for the push service
#[derive(Clone)]
pub struct PushCredentials {
    /// Full `messages:send` URL
    pub endpoint: String,
    pub bearer_token: String,
    pub timeout: Duration,
}

impl PushCredentials {
    pub fn new(endpoint: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bearer_token: bearer_token.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for PushCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushCredentials")
            .field("endpoint", &self.endpoint)
            .field("bearer_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct HttpPushSender {
    credentials: PushCredentials,
    client: reqwest::Client,
}

impl HttpPushSender {
    pub fn new(credentials: PushCredentials) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(credentials.timeout)
            .build()
            .map_err(|e| NotificationError::SenderMisconfigured(e.to_string()))?;
        Ok(Self { credentials, client })
    }

    fn payload(message: &PushMessage) -> Value {
        json!({
            "message": {
                "token": message.token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
                "data": message.data,
                "android": {
                    "priority": "high",
                    "notification": {
                        "sound": "default",
                        "channel_id": ANDROID_CHANNEL_ID,
                    },
                },
                "apns": {
                    "payload": {
                        "aps": {
                            "sound": "default",
                            "badge": 1,
                        },
                    },
                },
            }
        })
    }
}

impl DomainPort for HttpPushSender {}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(&self, message: &PushMessage) -> Result<String, NotificationError> {
        if self.credentials.endpoint.trim().is_empty() || self.credentials.bearer_token.trim().is_empty() {
            return Err(NotificationError::SenderMisconfigured(
                "push endpoint and token are required".to_string(),
            ));
        }

        debug!(endpoint = %self.credentials.endpoint, "Sending push message");
        let response = self
            .client
            .post(&self.credentials.endpoint)
            .bearer_auth(&self.credentials.bearer_token)
            .json(&Self::payload(message))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Delivery("push service timed out".to_string())
                } else {
                    NotificationError::Delivery(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Delivery(format!(
                "push service returned {}: {}",
                status.as_u16(),
                body.chars().take(256).collect::<String>()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| NotificationError::Delivery(format!("unreadable push response: {}", e)))?;
        body.get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| NotificationError::Delivery("push response has no message name".to_string()))
    }
}
