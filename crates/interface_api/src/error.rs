//! API error handling
//!
//! Domain errors keep their machine-readable `kind` in the response body so
//! the admin frontend can branch on it without parsing messages.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use domain_notification::NotificationError;
use domain_payment::PaymentError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Payment(err) => payment_status(err),
            ApiError::Notification(err) => notification_status(err),
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Payment(err) => err.kind(),
            ApiError::Notification(err) => err.kind(),
            ApiError::BadRequest(_) | ApiError::Validation(_) => "invalid_request",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

fn payment_status(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PaymentError::UnknownBooking(_) => StatusCode::NOT_FOUND,
        PaymentError::UnauthenticatedCallback => StatusCode::UNAUTHORIZED,
        PaymentError::IntentResolved { .. }
        | PaymentError::RetryExhausted { .. }
        | PaymentError::CallbackConflict { .. }
        | PaymentError::CallbackOutOfOrder { .. }
        | PaymentError::StaleTransition { .. } => StatusCode::CONFLICT,
        PaymentError::GatewayRejected { .. } => StatusCode::BAD_GATEWAY,
        PaymentError::GatewayUnreachable(_) => StatusCode::GATEWAY_TIMEOUT,
        PaymentError::GatewayMisconfigured(_) | PaymentError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn notification_status(err: &NotificationError) -> StatusCode {
    match err {
        NotificationError::InvalidRequest(_) | NotificationError::MissingPushToken(_) => {
            StatusCode::BAD_REQUEST
        }
        NotificationError::UnknownRecipient(_) => StatusCode::NOT_FOUND,
        NotificationError::Delivery(_) => StatusCode::BAD_GATEWAY,
        NotificationError::SenderMisconfigured(_) | NotificationError::Directory(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, kind = self.kind(), status = status.as_u16(), "Request failed");
        }

        let details = match &self {
            ApiError::Validation(errors) => Some(
                errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |e| match &e.message {
                            Some(message) => format!("{}: {}", field, message),
                            None => format!("{}: {}", field, e.code),
                        })
                    })
                    .collect(),
            ),
            _ => None,
        };

        let message = match &self {
            // hide internals of store failures from callers
            ApiError::Payment(PaymentError::Store(_))
            | ApiError::Notification(NotificationError::Directory(_)) => {
                "Storage is temporarily unavailable".to_string()
            }
            ApiError::Validation(_) => "Request failed validation".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: self.kind().to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{BookingRef, PortError};
    use domain_payment::IntentState;

    fn booking() -> BookingRef {
        BookingRef::parse("B1").unwrap()
    }

    #[test]
    fn test_payment_error_statuses() {
        let cases = [
            (PaymentError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (PaymentError::UnknownBooking(booking()), StatusCode::NOT_FOUND),
            (PaymentError::UnauthenticatedCallback, StatusCode::UNAUTHORIZED),
            (
                PaymentError::IntentResolved { booking_ref: booking(), state: IntentState::Verified },
                StatusCode::CONFLICT,
            ),
            (
                PaymentError::RetryExhausted { booking_ref: booking(), attempts: 5 },
                StatusCode::CONFLICT,
            ),
            (
                PaymentError::GatewayRejected { status: 500, body: String::new() },
                StatusCode::BAD_GATEWAY,
            ),
            (PaymentError::GatewayUnreachable("timeout".into()), StatusCode::GATEWAY_TIMEOUT),
            (PaymentError::GatewayMisconfigured("token".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (PaymentError::Store(PortError::internal("down")), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_notification_error_statuses() {
        assert_eq!(
            ApiError::from(NotificationError::UnknownRecipient("u1".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(NotificationError::MissingPushToken("u1".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(NotificationError::Delivery("unregistered".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_kind_comes_from_domain_error() {
        let err = ApiError::from(PaymentError::UnauthenticatedCallback);
        assert_eq!(err.kind(), "unauthenticated_callback");
    }
}
