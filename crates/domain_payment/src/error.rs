//! Payment domain errors

use thiserror::Error;

use core_kernel::{BookingRef, CoreError, PortError};

use crate::gateway::GatewayError;
use crate::intent::IntentState;

/// Errors surfaced by the payment orchestrator and callback verifier
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payment gateway is not configured: {0}")]
    GatewayMisconfigured(String),

    #[error("Payment gateway unreachable: {0}")]
    GatewayUnreachable(String),

    #[error("Payment gateway rejected the request with status {status}")]
    GatewayRejected { status: u16, body: String },

    #[error("Booking {booking_ref} reached the limit of {attempts} gateway attempts")]
    RetryExhausted { booking_ref: BookingRef, attempts: u32 },

    #[error("No payment intent for booking {0}")]
    UnknownBooking(BookingRef),

    #[error("Payment for booking {booking_ref} is already {state}")]
    IntentResolved { booking_ref: BookingRef, state: IntentState },

    #[error("Payment for booking {booking_ref} changed concurrently; now {current}")]
    StaleTransition { booking_ref: BookingRef, current: IntentState },

    #[error("Callback signature is missing or invalid")]
    UnauthenticatedCallback,

    #[error("Callback result '{reported}' conflicts with recorded '{recorded}' for booking {booking_ref}")]
    CallbackConflict {
        booking_ref: BookingRef,
        recorded: String,
        reported: String,
    },

    #[error("Callback for booking {booking_ref} arrived while the payment is {state}")]
    CallbackOutOfOrder { booking_ref: BookingRef, state: IntentState },

    #[error("Intent store error: {0}")]
    Store(#[from] PortError),
}

impl PaymentError {
    /// True for failures a caller may retry unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::GatewayUnreachable(_)
            | PaymentError::GatewayRejected { .. }
            | PaymentError::StaleTransition { .. } => true,
            PaymentError::Store(err) => err.is_transient(),
            _ => false,
        }
    }

    /// Stable machine-readable name used in API error bodies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::InvalidRequest(_) => "invalid_request",
            PaymentError::GatewayMisconfigured(_) => "gateway_misconfigured",
            PaymentError::GatewayUnreachable(_) => "gateway_unreachable",
            PaymentError::GatewayRejected { .. } => "gateway_rejected",
            PaymentError::RetryExhausted { .. } => "retry_exhausted",
            PaymentError::UnknownBooking(_) => "unknown_booking",
            PaymentError::IntentResolved { .. } => "intent_resolved",
            PaymentError::StaleTransition { .. } => "stale_transition",
            PaymentError::UnauthenticatedCallback => "unauthenticated_callback",
            PaymentError::CallbackConflict { .. } => "callback_conflict",
            PaymentError::CallbackOutOfOrder { .. } => "callback_out_of_order",
            PaymentError::Store(_) => "store_error",
        }
    }
}

impl From<GatewayError> for PaymentError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Misconfigured(message) => PaymentError::GatewayMisconfigured(message),
            GatewayError::Unreachable(message) => PaymentError::GatewayUnreachable(message),
            GatewayError::Rejected { status, body } => PaymentError::GatewayRejected { status, body },
        }
    }
}

impl From<CoreError> for PaymentError {
    fn from(err: CoreError) -> Self {
        if err.is_client_error() {
            PaymentError::InvalidRequest(err.to_string())
        } else {
            PaymentError::Store(PortError::internal(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_map_to_kinds() {
        let rejected: PaymentError = GatewayError::Rejected { status: 500, body: String::new() }.into();
        assert_eq!(rejected.kind(), "gateway_rejected");
        assert!(rejected.is_retryable());

        let misconfigured: PaymentError = GatewayError::Misconfigured("bearer_token".into()).into();
        assert!(!misconfigured.is_retryable());
    }

    #[test]
    fn test_validation_is_invalid_request() {
        let err: PaymentError = CoreError::validation("email").into();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
    }
}
