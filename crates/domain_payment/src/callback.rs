//! Gateway callback verification
//!
//! The gateway notifies `POST /api/payment/callback` when a payer finishes on
//! the hosted page. Each callback carries a lowercase hex HMAC-SHA256 of
//! `"{booking_ref}.{result}"` keyed with the shared callback secret.
//!
//! Callbacks are applied through the same guarded transition as `verify`, so
//! a callback and a verify poll racing for the same booking settle once.
//! Redelivery of a recorded result is acknowledged; a different result for a
//! settled booking is refused and the intent is flagged for review.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use core_kernel::BookingRef;

use crate::error::PaymentError;
use crate::gateway::VerificationOutcome;
use crate::intent::{IntentState, VerificationRecord, VerificationSource};
use crate::orchestrator::PaymentOrchestrator;

type HmacSha256 = Hmac<Sha256>;

/// Signs a callback the way the gateway does
///
/// Returns `None` if the secret is empty.
pub fn sign_callback(secret: &str, booking_ref: &str, result: &str) -> Option<String> {
    if secret.is_empty() {
        return None;
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(booking_ref.as_bytes());
    mac.update(b".");
    mac.update(result.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a callback signature in constant time
pub fn verify_callback_signature(secret: &str, booking_ref: &str, result: &str, signature: &str) -> bool {
    match sign_callback(secret, booking_ref, result) {
        Some(expected) => {
            let provided = signature.trim().to_ascii_lowercase();
            expected.as_bytes().ct_eq(provided.as_bytes()).into()
        }
        None => false,
    }
}

/// Inbound gateway callback
#[derive(Debug, Clone)]
pub struct GatewayCallback {
    pub booking_ref: String,
    pub result: String,
    pub signature: String,
    pub details: serde_json::Value,
}

/// Acknowledgement returned to the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAck {
    pub booking_ref: BookingRef,
    pub state: IntentState,
    /// True when the result was already recorded
    pub replayed: bool,
}

/// Authenticates callbacks and applies them to intents
pub struct CallbackVerifier {
    secret: String,
    orchestrator: Arc<PaymentOrchestrator>,
}

impl CallbackVerifier {
    pub fn new(secret: impl Into<String>, orchestrator: Arc<PaymentOrchestrator>) -> Self {
        Self {
            secret: secret.into(),
            orchestrator,
        }
    }

    pub async fn handle_callback(&self, callback: GatewayCallback) -> Result<CallbackAck, PaymentError> {
        if !verify_callback_signature(
            &self.secret,
            &callback.booking_ref,
            &callback.result,
            &callback.signature,
        ) {
            warn!(booking_ref = %callback.booking_ref, "Rejected callback with bad signature");
            return Err(PaymentError::UnauthenticatedCallback);
        }

        let booking_ref = BookingRef::parse(callback.booking_ref.as_str())?;
        let store = self.orchestrator.store();
        let intent = store
            .get(&booking_ref)
            .await?
            .ok_or_else(|| PaymentError::UnknownBooking(booking_ref.clone()))?;

        match intent.state {
            IntentState::Verified | IntentState::VerificationFailed => {
                self.acknowledge_recorded(
                    &booking_ref,
                    intent.state,
                    intent.verification.as_ref(),
                    &callback.result,
                    true,
                )
                .await
            }
            IntentState::GatewayPending | IntentState::GatewayFailed => {
                let outcome = VerificationOutcome::from_result_code(&callback.result);
                if intent.state == IntentState::GatewayFailed && !outcome.is_success() {
                    // only a settled session may resolve a failed initiation
                    return self.out_of_order(&booking_ref, intent.state).await;
                }
                let applied = self
                    .orchestrator
                    .mark_completed(&booking_ref, &outcome, callback.details, VerificationSource::Callback)
                    .await?;
                let state = applied.intent.state;
                if !state.is_resolved() {
                    // moved away (expired) between read and write
                    return self.out_of_order(&booking_ref, state).await;
                }
                self.acknowledge_recorded(
                    &booking_ref,
                    state,
                    applied.intent.verification.as_ref(),
                    &callback.result,
                    applied.cached,
                )
                .await
            }
            IntentState::Created | IntentState::Expired => {
                self.out_of_order(&booking_ref, intent.state).await
            }
        }
    }

    async fn acknowledge_recorded(
        &self,
        booking_ref: &BookingRef,
        state: IntentState,
        recorded: Option<&VerificationRecord>,
        reported: &str,
        replayed: bool,
    ) -> Result<CallbackAck, PaymentError> {
        let recorded_code = recorded
            .map(|record| record.result_code.clone())
            .unwrap_or_default();
        if recorded.is_some_and(|record| record.matches_result(reported)) {
            info!(booking_ref = %booking_ref, state = %state, replayed, "Callback acknowledged");
            return Ok(CallbackAck {
                booking_ref: booking_ref.clone(),
                state,
                replayed,
            });
        }

        warn!(
            booking_ref = %booking_ref,
            recorded = %recorded_code,
            reported = %reported,
            "Callback conflicts with recorded payment outcome"
        );
        self.orchestrator
            .store()
            .flag_for_review(
                booking_ref,
                &format!("callback reported '{}' but '{}' is recorded", reported, recorded_code),
            )
            .await?;
        Err(PaymentError::CallbackConflict {
            booking_ref: booking_ref.clone(),
            recorded: recorded_code,
            reported: reported.to_string(),
        })
    }

    async fn out_of_order(&self, booking_ref: &BookingRef, state: IntentState) -> Result<CallbackAck, PaymentError> {
        warn!(booking_ref = %booking_ref, state = %state, "Callback arrived out of order");
        self.orchestrator
            .store()
            .flag_for_review(booking_ref, &format!("callback received while intent was {}", state))
            .await?;
        Err(PaymentError::CallbackOutOfOrder {
            booking_ref: booking_ref.clone(),
            state,
        })
    }
}
