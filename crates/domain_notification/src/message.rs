//! Notification requests and push payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::NotificationError;

/// Android channel the mobile app registers for platform notifications
pub const ANDROID_CHANNEL_ID: &str = "marhabten_notifications";

/// Staff request to notify one user
#[derive(Debug, Clone, Default)]
pub struct SendNotification {
    /// Free-form category (`booking`, `message`, `payment_success`, ...)
    pub kind: String,
    pub recipient_id: String,
    pub title: String,
    pub body: String,
    pub data: Map<String, Value>,
}

impl SendNotification {
    pub fn new(
        kind: impl Into<String>,
        recipient_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            recipient_id: recipient_id.into(),
            title: title.into(),
            body: body.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Rejects requests missing any required field
    pub fn validate(&self) -> Result<(), NotificationError> {
        let missing: Vec<&str> = [
            ("type", &self.kind),
            ("recipientId", &self.recipient_id),
            ("title", &self.title),
            ("body", &self.body),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::InvalidRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// Data map sent with the push: `type` plus every caller entry as a string
    ///
    /// Caller entries override `type`; null entries are dropped.
    pub fn push_data(&self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        data.insert("type".to_string(), self.kind.clone());
        for (key, value) in &self.data {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            data.insert(key.clone(), text);
        }
        data
    }
}

/// A message ready for the push service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}
