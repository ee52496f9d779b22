//! Staff payment intent handlers

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension, Json,
};
use chrono::Utc;

use crate::auth::{permissions, require, Claims};
use crate::dto::payment::*;
use crate::{error::ApiError, AppState};

/// Lists the most recent intents, newest first
pub async fn list_intents(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<ListIntentsQuery>, QueryRejection>,
) -> Result<Json<Vec<IntentResponse>>, ApiError> {
    require(&claims, permissions::PAYMENTS_READ)?;
    let Query(query) = query?;

    let intents = state
        .orchestrator
        .recent_intents(query.effective_limit())
        .await?;
    Ok(Json(intents.into_iter().map(IntentResponse::from).collect()))
}

/// Gets the current intent of a booking
pub async fn get_intent(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_ref): Path<String>,
) -> Result<Json<IntentResponse>, ApiError> {
    require(&claims, permissions::PAYMENTS_READ)?;

    let intent = state.orchestrator.intent(&booking_ref).await?;
    Ok(Json(intent.into()))
}

/// Expires abandoned intents now
pub async fn sweep(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SweepResponse>, ApiError> {
    require(&claims, permissions::PAYMENTS_SWEEP)?;

    let report = state.orchestrator.sweep_expired(Utc::now()).await?;
    Ok(Json(report.into()))
}
