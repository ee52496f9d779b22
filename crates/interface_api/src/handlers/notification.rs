//! Push notification handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::auth::{permissions, require, Claims};
use crate::dto::notification::*;
use crate::{error::ApiError, AppState};

/// Sends a push notification to one user
pub async fn send_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<Json<SendNotificationResponse>, ApiError> {
    require(&claims, permissions::NOTIFICATIONS_SEND)?;
    let Json(request) = payload?;

    let outcome = state.notifications.send(request.into()).await?;
    Ok(Json(outcome.into()))
}
