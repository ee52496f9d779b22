//! Payment DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use domain_payment::{
    CallbackAck, GatewayCallback, InitiateOutcome, PaymentIntent, SweepReport, VerifyOutcome,
};

/// Default and maximum page sizes for the intent listing
pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    #[validate(length(min = 1, message = "bookingId is required"))]
    pub booking_id: String,
    /// Major units, e.g. `125.50`
    pub amount: Decimal,
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub payment_url: String,
    pub custom_ref: String,
}

impl From<InitiateOutcome> for InitiatePaymentResponse {
    fn from(outcome: InitiateOutcome) -> Self {
        Self {
            success: true,
            payment_url: outcome.payment_url,
            custom_ref: outcome.intent.booking_ref.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, message = "customRef is required"))]
    pub custom_ref: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub verified: bool,
    pub custom_ref: String,
    pub details: Value,
}

impl From<VerifyOutcome> for VerifyPaymentResponse {
    fn from(outcome: VerifyOutcome) -> Self {
        Self {
            success: true,
            verified: outcome.verified,
            custom_ref: outcome.intent.booking_ref.to_string(),
            details: outcome.details,
        }
    }
}

/// Server-to-server notification from the gateway
///
/// Fields beyond the signed ones are kept as audit details.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    #[serde(default)]
    pub booking_ref: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub signature: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl CallbackRequest {
    pub fn into_callback(self) -> GatewayCallback {
        let mut details = self.extra;
        details.insert("bookingRef".to_string(), Value::String(self.booking_ref.clone()));
        details.insert("result".to_string(), Value::String(self.result.clone()));
        GatewayCallback {
            booking_ref: self.booking_ref,
            result: self.result,
            signature: self.signature,
            details: Value::Object(details),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub success: bool,
    pub booking_ref: String,
    pub state: String,
    pub replayed: bool,
}

impl From<CallbackAck> for CallbackResponse {
    fn from(ack: CallbackAck) -> Self {
        Self {
            success: true,
            booking_ref: ack.booking_ref.to_string(),
            state: ack.state.to_string(),
            replayed: ack.replayed,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListIntentsQuery {
    pub limit: Option<u32>,
}

impl ListIntentsQuery {
    /// Requested page size clamped to `1..=MAX_LIST_LIMIT`
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }
}

/// Staff view of an intent
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub id: String,
    pub booking_ref: String,
    pub state: String,
    /// Major units as a decimal string
    pub amount: String,
    pub currency: String,
    pub payer_email: String,
    pub payer_phone: Option<String>,
    pub gateway_ref: Option<String>,
    pub payment_url: Option<String>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub verified: bool,
    pub verification: Option<Value>,
    pub needs_review: bool,
    pub review_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentIntent> for IntentResponse {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            id: intent.id.to_string(),
            booking_ref: intent.booking_ref.to_string(),
            state: intent.state.to_string(),
            amount: intent.amount.to_major_string(),
            currency: intent.amount.currency().code().to_string(),
            verified: intent.is_verified(),
            verification: intent
                .verification
                .as_ref()
                .and_then(|record| serde_json::to_value(record).ok()),
            payer_email: intent.payer_email,
            payer_phone: intent.payer_phone,
            gateway_ref: intent.gateway_ref,
            payment_url: intent.redirect_url,
            attempts: intent.attempts,
            last_error: intent.last_error,
            needs_review: intent.needs_review,
            review_reason: intent.review_reason,
            created_at: intent.created_at,
            updated_at: intent.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub expired: Vec<String>,
    pub skipped: usize,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            expired: report.expired.iter().map(ToString::to_string).collect(),
            skipped: report.skipped,
        }
    }
}
