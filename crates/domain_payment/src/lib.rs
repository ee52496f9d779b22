//! Booking Payment Domain
//!
//! This crate bridges the booking admin backend and the hosted payment
//! gateway. It owns the payment intent lifecycle and makes the payment
//! endpoints safe to retry:
//!
//! - **Intents**: one live [`PaymentIntent`] per booking, moved only along
//!   forward edges of [`IntentState`]
//! - **Idempotency**: repeated or concurrent initiates for a booking replay a
//!   single gateway session
//! - **Verification**: receipt polling and signed gateway callbacks resolve an
//!   intent exactly once
//! - **Expiry**: abandoned intents are swept so the booking can start over
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_payment::{
//!     HttpGatewayClient, GatewayCredentials, InMemoryIntentStore,
//!     InitiatePayment, OrchestratorConfig, PaymentOrchestrator,
//! };
//!
//! let gateway = HttpGatewayClient::new(GatewayCredentials::new(base_url, merchant_id, token))?;
//! let orchestrator = PaymentOrchestrator::new(
//!     Arc::new(InMemoryIntentStore::new()),
//!     Arc::new(gateway),
//!     OrchestratorConfig::for_app_url("https://admin.example"),
//! );
//!
//! let outcome = orchestrator
//!     .initiate(InitiatePayment::new("B-1042", amount, "guest@example.com"))
//!     .await?;
//! // redirect the payer to outcome.payment_url
//! ```

pub mod intent;
pub mod gateway;
pub mod error;
pub mod ports;
pub mod adapters;
pub mod orchestrator;
pub mod callback;

pub use intent::{IntentState, PaymentIntent, VerificationRecord, VerificationSource};
pub use gateway::{
    GatewayCredentials, GatewayError, GatewayInitiateRequest, GatewayInitiateResponse,
    GatewayVerification, PaymentGateway, VerificationOutcome,
};
pub use error::PaymentError;
pub use ports::{BookingLock, IntentStore, TransitionError};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::ScriptedGateway;
pub use adapters::{HttpGatewayClient, InMemoryIntentStore};
pub use orchestrator::{
    InitiateOutcome, InitiatePayment, OrchestratorConfig, PaymentOrchestrator, SweepReport,
    VerifyOutcome,
};
pub use callback::{sign_callback, verify_callback_signature, CallbackAck, CallbackVerifier, GatewayCallback};
