//! HTTP API Layer
//!
//! REST surface of the booking payment bridge, built on Axum.
//!
//! # Routes
//!
//! Public (frontend and gateway):
//! - `POST /api/payment/initiate` start or resume payment for a booking
//! - `POST /api/payment/verify` confirm payment with the gateway
//! - `POST /api/payment/callback` signed server-to-server gateway notification
//! - `GET /health`, `GET /health/ready`
//!
//! Staff (bearer JWT, audited):
//! - `POST /api/v1/notifications/send`
//! - `GET /api/v1/payments/intents?limit=N`
//! - `GET /api/v1/payments/intents/:booking_ref`
//! - `POST /api/v1/payments/sweep`
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(orchestrator, notifications, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_notification::NotificationService;
use domain_payment::{CallbackVerifier, PaymentOrchestrator};

use crate::config::ApiConfig;
use crate::handlers::{health, intents, notification, payment};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub callbacks: Arc<CallbackVerifier>,
    pub notifications: Arc<NotificationService>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    /// Builds the state; the callback verifier shares the orchestrator
    pub fn new(
        orchestrator: Arc<PaymentOrchestrator>,
        notifications: Arc<NotificationService>,
        config: ApiConfig,
    ) -> Self {
        let callbacks = Arc::new(CallbackVerifier::new(
            config.callback_secret.clone(),
            orchestrator.clone(),
        ));
        Self {
            orchestrator,
            callbacks,
            notifications,
            config: Arc::new(config),
        }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let payment_routes = Router::new()
        .route("/initiate", post(payment::initiate))
        .route("/verify", post(payment::verify))
        .route("/callback", post(payment::callback));

    let staff_routes = Router::new()
        .route("/notifications/send", post(notification::send_notification))
        .route("/payments/intents", get(intents::list_intents))
        .route("/payments/intents/:booking_ref", get(intents::get_intent))
        .route("/payments/sweep", post(intents::sweep))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/payment", payment_routes)
        .nest("/api/v1", staff_routes)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
