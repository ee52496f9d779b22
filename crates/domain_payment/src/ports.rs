//! Payment Domain Ports
//!
//! The orchestrator depends on two ports: [`PaymentGateway`](crate::gateway::PaymentGateway)
//! for the outbound gateway and [`IntentStore`] for the durable intent table.
//!
//! # Guarded transitions
//!
//! Every state change goes through [`IntentStore::transition`], which applies
//! the change only if the intent is still in one of the expected states. Two
//! resolvers racing (verify polling and the gateway callback) therefore cannot
//! both win: the loser gets [`TransitionError::Stale`] and re-reads.
//!
//! # Per-booking exclusion
//!
//! [`IntentStore::lock_booking`] serializes the initiate path for a single
//! booking, including the outbound gateway call, so concurrent initiates for
//! the same booking produce exactly one gateway session.
//!
//! ```rust,ignore
//! let _lock = store.lock_booking(&booking_ref).await?;
//! let intent = store.get_or_create(&booking_ref, &|| PaymentIntent::new(..)).await?;
//! // ... call the gateway, then transition ...
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use core_kernel::{BookingRef, DomainPort, HealthCheckable, PortError};

use crate::intent::{IntentState, PaymentIntent};

/// Builds the intent to insert when a booking has none
pub type IntentFactory<'a> = &'a (dyn Fn() -> PaymentIntent + Send + Sync);

/// Mutation applied alongside a guarded transition
pub type IntentMutation<'a> = &'a (dyn Fn(&mut PaymentIntent) + Send + Sync);

/// Exclusive hold on one booking's initiate path, released on drop
pub struct BookingLock {
    _guard: Box<dyn Send>,
}

impl BookingLock {
    pub fn new<G: Send + 'static>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl fmt::Debug for BookingLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BookingLock")
    }
}

/// Why a guarded transition did not apply
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The intent is not in any of the expected states
    #[error("intent is {current}, transition not applied")]
    Stale { current: IntentState },

    #[error("no payment intent for booking {0}")]
    NotFound(BookingRef),

    #[error(transparent)]
    Port(#[from] PortError),
}

/// Durable store of payment intents keyed by booking reference
///
/// At most one non-expired intent exists per booking. Expired intents are
/// kept for audit and never returned by `get` while a live intent exists.
#[async_trait]
pub trait IntentStore: DomainPort + HealthCheckable {
    /// Acquires the per-booking initiate lock
    async fn lock_booking(&self, booking_ref: &BookingRef) -> Result<BookingLock, PortError>;

    /// Returns the current intent for a booking, preferring a live one
    async fn get(&self, booking_ref: &BookingRef) -> Result<Option<PaymentIntent>, PortError>;

    /// Returns the live intent, inserting `factory()` if there is none
    async fn get_or_create(
        &self,
        booking_ref: &BookingRef,
        factory: IntentFactory<'_>,
    ) -> Result<PaymentIntent, PortError>;

    /// Moves the live intent to `to` if its state is one of `from`
    ///
    /// `mutate` runs on the stored copy before the state change is written;
    /// `updated_at` is refreshed by the store.
    async fn transition(
        &self,
        booking_ref: &BookingRef,
        from: &[IntentState],
        to: IntentState,
        mutate: IntentMutation<'_>,
    ) -> Result<PaymentIntent, TransitionError>;

    /// Marks the current intent for operator attention without changing state
    async fn flag_for_review(&self, booking_ref: &BookingRef, reason: &str) -> Result<(), PortError>;

    /// Intents in `states` created before `created_before`, oldest first
    async fn list_stale(
        &self,
        states: &[IntentState],
        created_before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<PaymentIntent>, PortError>;

    /// Most recently created intents, newest first, including expired ones
    async fn list_recent(&self, limit: u32) -> Result<Vec<PaymentIntent>, PortError>;
}

/// Scripted gateway double for orchestrator and API tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::gateway::{
        GatewayError, GatewayInitiateRequest, GatewayInitiateResponse, GatewayVerification,
        PaymentGateway, VerificationOutcome,
    };

    /// Gateway that replays queued results and counts calls
    ///
    /// With an empty queue, initiate succeeds with
    /// `https://pay.test/session/{booking_ref}` and verify reports success.
    #[derive(Debug, Default)]
    pub struct ScriptedGateway {
        initiate_results: Mutex<VecDeque<Result<GatewayInitiateResponse, GatewayError>>>,
        verify_results: Mutex<VecDeque<Result<GatewayVerification, GatewayError>>>,
        initiate_requests: Mutex<Vec<GatewayInitiateRequest>>,
        initiate_calls: AtomicUsize,
        verify_calls: AtomicUsize,
        delay: Duration,
        slow_calls: Option<usize>,
    }

    impl ScriptedGateway {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sleeps this long inside every call
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Limits the delay to the first `count` calls of each kind
        pub fn slow_for(mut self, count: usize) -> Self {
            self.slow_calls = Some(count);
            self
        }

        async fn pause(&self, call: usize) {
            if !self.delay.is_zero() && self.slow_calls.map_or(true, |count| call < count) {
                tokio::time::sleep(self.delay).await;
            }
        }

        pub fn push_initiate(&self, result: Result<GatewayInitiateResponse, GatewayError>) {
            if let Ok(mut queue) = self.initiate_results.lock() {
                queue.push_back(result);
            }
        }

        pub fn push_verify(&self, result: Result<GatewayVerification, GatewayError>) {
            if let Ok(mut queue) = self.verify_results.lock() {
                queue.push_back(result);
            }
        }

        /// Queues a verify answer with the given outcome and an empty payload
        pub fn push_outcome(&self, outcome: VerificationOutcome) {
            self.push_verify(Ok(GatewayVerification {
                outcome,
                raw: serde_json::json!({}),
            }));
        }

        pub fn initiate_calls(&self) -> usize {
            self.initiate_calls.load(Ordering::SeqCst)
        }

        pub fn verify_calls(&self) -> usize {
            self.verify_calls.load(Ordering::SeqCst)
        }

        /// Requests received by `initiate`, in order
        pub fn initiate_requests(&self) -> Vec<GatewayInitiateRequest> {
            self.initiate_requests
                .lock()
                .map(|requests| requests.clone())
                .unwrap_or_default()
        }

        pub fn session_url(booking_ref: &BookingRef) -> String {
            format!("https://pay.test/session/{}", booking_ref)
        }
    }

    impl DomainPort for ScriptedGateway {}

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn initiate(
            &self,
            request: GatewayInitiateRequest,
        ) -> Result<GatewayInitiateResponse, GatewayError> {
            let call = self.initiate_calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut requests) = self.initiate_requests.lock() {
                requests.push(request.clone());
            }
            self.pause(call).await;

            let scripted = self
                .initiate_results
                .lock()
                .ok()
                .and_then(|mut queue| queue.pop_front());
            scripted.unwrap_or_else(|| {
                Ok(GatewayInitiateResponse {
                    redirect_url: Self::session_url(&request.booking_ref),
                    gateway_ref: None,
                    raw: serde_json::json!({ "url": Self::session_url(&request.booking_ref) }),
                })
            })
        }

        async fn verify(
            &self,
            _booking_ref: &BookingRef,
        ) -> Result<GatewayVerification, GatewayError> {
            let call = self.verify_calls.fetch_add(1, Ordering::SeqCst);
            self.pause(call).await;

            let scripted = self
                .verify_results
                .lock()
                .ok()
                .and_then(|mut queue| queue.pop_front());
            scripted.unwrap_or_else(|| {
                Ok(GatewayVerification {
                    outcome: VerificationOutcome::Success,
                    raw: serde_json::json!({ "result": "success" }),
                })
            })
        }
    }
}
