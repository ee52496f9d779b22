//! Payment intents and their lifecycle
//!
//! A payment intent is the bridge's record of one attempt to collect money for
//! one booking. Its state only moves forward along the edges accepted by
//! [`IntentState::can_transition_to`]:
//!
//! ```text
//! Created ──► GatewayPending ──► Verified
//!    │  ▲            │      └──► VerificationFailed
//!    │  │            └─────────► Expired
//!    ▼  │
//! GatewayFailed ───────────────► Verified
//!    (Created ─────────────────► Expired)
//! ```
//!
//! `Verified`, `VerificationFailed` and `Expired` are terminal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BookingRef, CoreError, IntentId, Money};

/// Result code the gateway reports for a settled payment
pub const SUCCESS_RESULT: &str = "success";

/// Lifecycle state of a payment intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentState {
    /// Recorded, no successful gateway call yet
    Created,
    /// Gateway accepted the initiation and returned a redirect URL
    GatewayPending,
    /// Last gateway initiation failed; may be retried
    GatewayFailed,
    /// Gateway confirmed payment
    Verified,
    /// Gateway reported the payment failed or unknown
    VerificationFailed,
    /// Abandoned past its time-to-live
    Expired,
}

impl IntentState {
    /// Every state, in lifecycle order
    pub const ALL: [IntentState; 6] = [
        IntentState::Created,
        IntentState::GatewayPending,
        IntentState::GatewayFailed,
        IntentState::Verified,
        IntentState::VerificationFailed,
        IntentState::Expired,
    ];

    /// Checks if a transition to the target state is allowed
    pub fn can_transition_to(&self, target: IntentState) -> bool {
        use IntentState::*;

        matches!(
            (self, target),
            (Created, GatewayPending)
                | (Created, GatewayFailed)
                | (Created, Expired)
                | (GatewayPending, Verified)
                | (GatewayPending, VerificationFailed)
                | (GatewayPending, Expired)
                | (GatewayFailed, Created)
                | (GatewayFailed, Verified)
        )
    }

    /// No further transitions leave a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentState::Verified | IntentState::VerificationFailed | IntentState::Expired
        )
    }

    /// True once the gateway outcome has been recorded
    pub fn is_resolved(&self) -> bool {
        matches!(self, IntentState::Verified | IntentState::VerificationFailed)
    }

    /// Storage and wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentState::Created => "created",
            IntentState::GatewayPending => "gateway_pending",
            IntentState::GatewayFailed => "gateway_failed",
            IntentState::Verified => "verified",
            IntentState::VerificationFailed => "verification_failed",
            IntentState::Expired => "expired",
        }
    }
}

impl fmt::Display for IntentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntentState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| CoreError::validation(format!("unknown intent state '{}'", s)))
    }
}

/// Which path recorded a verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationSource {
    /// Pulled by polling the gateway receipt endpoint
    Verify,
    /// Pushed by the gateway's server-to-server callback
    Callback,
}

/// Outcome recorded when an intent is resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Normalized gateway result code (`success`, `failed`, `not_found`, ...)
    pub result_code: String,
    pub verified: bool,
    pub source: VerificationSource,
    /// Raw gateway payload, kept for audit
    pub details: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn new(
        result_code: impl Into<String>,
        source: VerificationSource,
        details: serde_json::Value,
    ) -> Self {
        let result_code = normalize_result_code(&result_code.into());
        Self {
            verified: result_code == SUCCESS_RESULT,
            result_code,
            source,
            details,
            recorded_at: Utc::now(),
        }
    }

    /// True if `result` names the same outcome as the recorded one
    pub fn matches_result(&self, result: &str) -> bool {
        self.result_code == normalize_result_code(result)
    }
}

/// Lowercases and trims a gateway result code
pub fn normalize_result_code(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}

/// One attempt to collect payment for one booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: IntentId,
    pub booking_ref: BookingRef,
    pub amount: Money,
    pub payer_email: String,
    pub payer_phone: Option<String>,
    pub state: IntentState,
    /// Reference the gateway knows the payment by
    pub gateway_ref: Option<String>,
    /// Hosted payment page returned by the gateway
    pub redirect_url: Option<String>,
    /// Number of gateway initiation calls made
    pub attempts: u32,
    pub last_error: Option<String>,
    pub verification: Option<VerificationRecord>,
    /// Set when a callback conflicted with recorded state
    pub needs_review: bool,
    pub review_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntent {
    /// Creates a fresh intent in `Created`
    pub fn new(
        booking_ref: BookingRef,
        amount: Money,
        payer_email: impl Into<String>,
        payer_phone: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: IntentId::new_v7(),
            booking_ref,
            amount,
            payer_email: payer_email.into(),
            payer_phone,
            state: IntentState::Created,
            gateway_ref: None,
            redirect_url: None,
            attempts: 0,
            last_error: None,
            verification: None,
            needs_review: false,
            review_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the intent to `target`, rejecting edges outside the lifecycle
    pub fn apply_transition(&mut self, target: IntentState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(target) {
            return Err(CoreError::invalid_state(self.state, target));
        }
        self.state = target;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Marks the intent for operator attention
    pub fn flag_for_review(&mut self, reason: impl Into<String>) {
        self.needs_review = true;
        self.review_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }

    pub fn is_verified(&self) -> bool {
        self.state == IntentState::Verified
    }

    /// True if the intent was created more than `ttl` before `now`
    pub fn is_older_than(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.created_at < now - ttl
    }
}
