//! Public payment handlers
//!
//! Called by the admin frontend (`initiate`, `verify`) and by the gateway
//! (`callback`). All three are safe to retry.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;
use validator::Validate;

use core_kernel::Money;
use domain_payment::{InitiatePayment, PaymentError};

use crate::dto::payment::*;
use crate::{error::ApiError, AppState};

/// Starts or resumes payment for a booking
pub async fn initiate(
    State(state): State<AppState>,
    payload: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> Result<Json<InitiatePaymentResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let currency = state.orchestrator.config().currency;
    let amount = Money::from_major(request.amount, currency)
        .map_err(|e| PaymentError::InvalidRequest(e.to_string()))?;

    let mut command = InitiatePayment::new(request.booking_id, amount, request.email);
    command.phone = request.phone;

    let outcome = state.orchestrator.initiate(command).await?;
    info!(
        booking_ref = %outcome.intent.booking_ref,
        replayed = outcome.replayed,
        "Payment session issued"
    );
    Ok(Json(outcome.into()))
}

/// Confirms payment with the gateway
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let outcome = state.orchestrator.verify(&request.custom_ref).await?;
    Ok(Json(outcome.into()))
}

/// Applies a signed gateway callback
pub async fn callback(
    State(state): State<AppState>,
    payload: Result<Json<CallbackRequest>, JsonRejection>,
) -> Result<Json<CallbackResponse>, ApiError> {
    let Json(request) = payload?;
    let ack = state.callbacks.handle_callback(request.into_callback()).await?;
    Ok(Json(ack.into()))
}
