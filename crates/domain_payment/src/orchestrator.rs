//! Payment orchestration
//!
//! [`PaymentOrchestrator`] drives the intent lifecycle:
//!
//! 1. `initiate` validates the request, takes the booking lock, finds or
//!    creates the live intent and either replays the stored redirect or calls
//!    the gateway exactly once.
//! 2. `verify` asks the gateway for the receipt of a pending intent and
//!    records the outcome through a guarded transition.
//! 3. `sweep_expired` moves abandoned intents to `Expired` so the booking can
//!    start over.
//!
//! Gateway failures never leave an intent half-updated: the intent either
//! moves to `GatewayPending` with the redirect URL or to `GatewayFailed` with
//! the attempt counted and the error recorded.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use validator::Validate;

use core_kernel::{BookingRef, Currency, Money, PortError};

use crate::error::PaymentError;
use crate::gateway::{
    GatewayError, GatewayInitiateRequest, GatewayInitiateResponse, GatewayVerification,
    PaymentGateway, VerificationOutcome,
};
use crate::intent::{IntentState, PaymentIntent, VerificationRecord, VerificationSource};
use crate::ports::{IntentStore, TransitionError};

/// Tunables for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Gateway initiation attempts allowed per intent
    pub max_attempts: u32,
    /// Age after which a pending intent is swept to `Expired`
    pub intent_ttl: Duration,
    /// Upper bound on each gateway call, whatever the adapter does
    pub gateway_timeout: std::time::Duration,
    /// Server-to-server notification URL handed to the gateway
    pub callback_url: String,
    /// Browser return URL handed to the gateway
    pub return_url: String,
    /// Currency booking amounts are quoted in
    pub currency: Currency,
    /// Intents expired per sweep run
    pub sweep_batch_size: u32,
}

impl OrchestratorConfig {
    /// Derives callback and return URLs from the public application URL
    pub fn for_app_url(app_url: &str) -> Self {
        let base = app_url.trim_end_matches('/');
        Self {
            callback_url: format!("{}/api/payment/callback", base),
            return_url: format!("{}/payment/success", base),
            ..Self::default()
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            intent_ttl: Duration::hours(24),
            gateway_timeout: std::time::Duration::from_secs(10),
            callback_url: "http://localhost:8080/api/payment/callback".to_string(),
            return_url: "http://localhost:8080/payment/success".to_string(),
            currency: Currency::USD,
            sweep_batch_size: 500,
        }
    }
}

/// Caller request to start (or resume) payment for a booking
#[derive(Debug, Clone, Validate)]
pub struct InitiatePayment {
    pub booking_ref: String,
    pub amount: Money,
    #[validate(email(message = "payer email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 4, max = 32, message = "payer phone must be 4 to 32 characters"))]
    pub phone: Option<String>,
}

impl InitiatePayment {
    pub fn new(booking_ref: impl Into<String>, amount: Money, email: impl Into<String>) -> Self {
        Self {
            booking_ref: booking_ref.into(),
            amount,
            email: email.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self.phone = self
            .phone
            .map(|phone| phone.trim().to_string())
            .filter(|phone| !phone.is_empty());
        self
    }
}

/// Result of `initiate`
#[derive(Debug, Clone)]
pub struct InitiateOutcome {
    pub intent: PaymentIntent,
    pub payment_url: String,
    /// True when the stored redirect was returned without a gateway call
    pub replayed: bool,
}

/// Result of `verify` and `mark_completed`
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub intent: PaymentIntent,
    pub verified: bool,
    pub details: serde_json::Value,
    /// True when the answer came from stored state rather than a new transition
    pub cached: bool,
}

impl VerifyOutcome {
    fn from_intent(intent: PaymentIntent, cached: bool) -> Self {
        let details = intent
            .verification
            .as_ref()
            .map(|record| record.details.clone())
            .unwrap_or(serde_json::Value::Null);
        Self {
            verified: intent.is_verified(),
            details,
            cached,
            intent,
        }
    }
}

/// Result of `sweep_expired`
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub expired: Vec<BookingRef>,
    /// Candidates that changed state before they could be expired
    pub skipped: usize,
}

/// Coordinates the intent store and the payment gateway
pub struct PaymentOrchestrator {
    store: Arc<dyn IntentStore>,
    gateway: Arc<dyn PaymentGateway>,
    config: OrchestratorConfig,
}

impl PaymentOrchestrator {
    pub fn new(
        store: Arc<dyn IntentStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn IntentStore> {
        &self.store
    }

    /// Starts payment for a booking, or replays the session already opened
    pub async fn initiate(&self, request: InitiatePayment) -> Result<InitiateOutcome, PaymentError> {
        let request = request.normalized();
        request
            .validate()
            .map_err(|e| PaymentError::InvalidRequest(e.to_string()))?;
        let booking_ref = BookingRef::parse(request.booking_ref.as_str())?;
        if !request.amount.is_positive() {
            return Err(PaymentError::InvalidRequest(
                "amount must be greater than zero".to_string(),
            ));
        }

        let _lock = self.store.lock_booking(&booking_ref).await?;

        let candidate = || {
            PaymentIntent::new(
                booking_ref.clone(),
                request.amount,
                request.email.clone(),
                request.phone.clone(),
            )
        };
        let intent = self.store.get_or_create(&booking_ref, &candidate).await?;

        if intent.amount != request.amount {
            return Err(PaymentError::InvalidRequest(format!(
                "booking {} already has a payment of {}",
                booking_ref, intent.amount
            )));
        }

        match intent.state {
            IntentState::GatewayPending | IntentState::Verified => {
                debug!(booking_ref = %booking_ref, state = %intent.state, "Replaying payment session");
                return Self::replay(intent);
            }
            IntentState::VerificationFailed => {
                return Err(PaymentError::IntentResolved {
                    booking_ref,
                    state: intent.state,
                });
            }
            IntentState::Expired => {
                return Err(PortError::internal("store returned an expired intent as live").into());
            }
            IntentState::Created | IntentState::GatewayFailed => {}
        }

        if intent.attempts >= self.config.max_attempts {
            warn!(booking_ref = %booking_ref, attempts = intent.attempts, "Gateway retry limit reached");
            return Err(PaymentError::RetryExhausted {
                booking_ref,
                attempts: intent.attempts,
            });
        }

        let intent = if intent.state == IntentState::GatewayFailed {
            self.store
                .transition(&booking_ref, &[IntentState::GatewayFailed], IntentState::Created, &|_| {})
                .await
                .map_err(|e| Self::transition_error(&booking_ref, e))?
        } else {
            intent
        };

        let gateway_request = GatewayInitiateRequest {
            booking_ref: booking_ref.clone(),
            amount: intent.amount,
            email: intent.payer_email.clone(),
            phone: intent.payer_phone.clone(),
            callback_url: self.config.callback_url.clone(),
            return_url: self.config.return_url.clone(),
        };

        match self.call_initiate(gateway_request).await {
            Ok(response) => {
                let redirect_url = response.redirect_url;
                let gateway_ref = response
                    .gateway_ref
                    .unwrap_or_else(|| booking_ref.to_string());
                let updated = self
                    .store
                    .transition(
                        &booking_ref,
                        &[IntentState::Created],
                        IntentState::GatewayPending,
                        &|intent| {
                            intent.attempts += 1;
                            intent.gateway_ref = Some(gateway_ref.clone());
                            intent.redirect_url = Some(redirect_url.clone());
                            intent.last_error = None;
                        },
                    )
                    .await
                    .map_err(|e| Self::transition_error(&booking_ref, e))?;

                info!(
                    booking_ref = %booking_ref,
                    intent_id = %updated.id,
                    attempts = updated.attempts,
                    gateway = self.gateway.name(),
                    "Payment session opened"
                );
                Ok(InitiateOutcome {
                    payment_url: redirect_url,
                    intent: updated,
                    replayed: false,
                })
            }
            Err(GatewayError::Misconfigured(message)) => {
                error!(booking_ref = %booking_ref, reason = %message, "Payment gateway is not configured");
                Err(PaymentError::GatewayMisconfigured(message))
            }
            Err(err) => {
                let description = err.to_string();
                let failed = self
                    .store
                    .transition(
                        &booking_ref,
                        &[IntentState::Created],
                        IntentState::GatewayFailed,
                        &|intent| {
                            intent.attempts += 1;
                            intent.last_error = Some(description.clone());
                        },
                    )
                    .await
                    .map_err(|e| Self::transition_error(&booking_ref, e))?;

                warn!(
                    booking_ref = %booking_ref,
                    attempts = failed.attempts,
                    error = %description,
                    "Payment gateway initiation failed"
                );
                Err(err.into())
            }
        }
    }

    /// Asks the gateway whether the booking's payment settled
    pub async fn verify(&self, booking_ref: &str) -> Result<VerifyOutcome, PaymentError> {
        let booking_ref = BookingRef::parse(booking_ref)?;
        let intent = self
            .store
            .get(&booking_ref)
            .await?
            .ok_or_else(|| PaymentError::UnknownBooking(booking_ref.clone()))?;

        match intent.state {
            IntentState::Verified | IntentState::VerificationFailed => {
                return Ok(VerifyOutcome::from_intent(intent, true));
            }
            IntentState::Created | IntentState::Expired => {
                debug!(booking_ref = %booking_ref, state = %intent.state, "Nothing to verify");
                return Ok(VerifyOutcome::from_intent(intent, true));
            }
            IntentState::GatewayPending | IntentState::GatewayFailed => {}
        }

        let verification = self.call_verify(&booking_ref).await.map_err(|err| {
            warn!(booking_ref = %booking_ref, error = %err, "Payment verification failed");
            PaymentError::from(err)
        })?;

        self.mark_completed(
            &booking_ref,
            &verification.outcome,
            verification.raw,
            VerificationSource::Verify,
        )
        .await
    }

    /// Records a gateway outcome through a guarded transition
    ///
    /// A success may resolve `GatewayPending` or `GatewayFailed` (the gateway
    /// can settle a session whose initiation response was lost); any other
    /// outcome only resolves `GatewayPending`. If another resolver won the
    /// race the stored intent is returned with `cached` set.
    pub async fn mark_completed(
        &self,
        booking_ref: &BookingRef,
        outcome: &VerificationOutcome,
        details: serde_json::Value,
        source: VerificationSource,
    ) -> Result<VerifyOutcome, PaymentError> {
        let from: &[IntentState] = if outcome.is_success() {
            &[IntentState::GatewayPending, IntentState::GatewayFailed]
        } else {
            &[IntentState::GatewayPending]
        };
        let target = if outcome.is_success() {
            IntentState::Verified
        } else {
            IntentState::VerificationFailed
        };
        let record = VerificationRecord::new(outcome.result_code(), source, details);

        match self
            .store
            .transition(booking_ref, from, target, &|intent| {
                intent.verification = Some(record.clone());
            })
            .await
        {
            Ok(intent) => {
                info!(
                    booking_ref = %booking_ref,
                    state = %intent.state,
                    result = %outcome.result_code(),
                    source = ?source,
                    "Payment outcome recorded"
                );
                Ok(VerifyOutcome::from_intent(intent, false))
            }
            Err(TransitionError::Stale { current }) => {
                debug!(booking_ref = %booking_ref, state = %current, "Outcome already settled");
                let intent = self
                    .store
                    .get(booking_ref)
                    .await?
                    .ok_or_else(|| PaymentError::UnknownBooking(booking_ref.clone()))?;
                Ok(VerifyOutcome::from_intent(intent, true))
            }
            Err(err) => Err(Self::transition_error(booking_ref, err)),
        }
    }

    /// Expires `Created` and `GatewayPending` intents older than the TTL
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, PaymentError> {
        let cutoff = now - self.config.intent_ttl;
        let candidates = self
            .store
            .list_stale(
                &[IntentState::Created, IntentState::GatewayPending],
                cutoff,
                self.config.sweep_batch_size,
            )
            .await?;

        let mut report = SweepReport::default();
        for intent in candidates {
            let _lock = self.store.lock_booking(&intent.booking_ref).await?;
            match self
                .store
                .transition(
                    &intent.booking_ref,
                    &[IntentState::Created, IntentState::GatewayPending],
                    IntentState::Expired,
                    &|_| {},
                )
                .await
            {
                Ok(_) => report.expired.push(intent.booking_ref.clone()),
                Err(TransitionError::Stale { .. }) | Err(TransitionError::NotFound(_)) => {
                    report.skipped += 1;
                }
                Err(TransitionError::Port(err)) => return Err(err.into()),
            }
        }

        if !report.expired.is_empty() {
            info!(
                expired = report.expired.len(),
                skipped = report.skipped,
                "Expired abandoned payment intents"
            );
        }
        Ok(report)
    }

    /// Current intent for a booking
    pub async fn intent(&self, booking_ref: &str) -> Result<PaymentIntent, PaymentError> {
        let booking_ref = BookingRef::parse(booking_ref)?;
        self.store
            .get(&booking_ref)
            .await?
            .ok_or(PaymentError::UnknownBooking(booking_ref))
    }

    /// Most recent intents, newest first
    pub async fn recent_intents(&self, limit: u32) -> Result<Vec<PaymentIntent>, PaymentError> {
        Ok(self.store.list_recent(limit).await?)
    }

    fn replay(intent: PaymentIntent) -> Result<InitiateOutcome, PaymentError> {
        match intent.redirect_url.clone() {
            Some(payment_url) => Ok(InitiateOutcome {
                intent,
                payment_url,
                replayed: true,
            }),
            // settled by verify after a lost initiation response
            None if intent.state == IntentState::Verified => Err(PaymentError::IntentResolved {
                booking_ref: intent.booking_ref,
                state: intent.state,
            }),
            None => Err(PortError::transformation(format!(
                "intent {} is {} without a redirect url",
                intent.id, intent.state
            ))
            .into()),
        }
    }

    async fn call_initiate(
        &self,
        request: GatewayInitiateRequest,
    ) -> Result<GatewayInitiateResponse, GatewayError> {
        tokio::time::timeout(self.config.gateway_timeout, self.gateway.initiate(request))
            .await
            .unwrap_or_else(|_| Err(self.timeout_error()))
    }

    async fn call_verify(&self, booking_ref: &BookingRef) -> Result<GatewayVerification, GatewayError> {
        tokio::time::timeout(self.config.gateway_timeout, self.gateway.verify(booking_ref))
            .await
            .unwrap_or_else(|_| Err(self.timeout_error()))
    }

    fn timeout_error(&self) -> GatewayError {
        GatewayError::Unreachable(format!(
            "timed out after {}ms",
            self.config.gateway_timeout.as_millis()
        ))
    }

    fn transition_error(booking_ref: &BookingRef, err: TransitionError) -> PaymentError {
        match err {
            TransitionError::Stale { current } => PaymentError::StaleTransition {
                booking_ref: booking_ref.clone(),
                current,
            },
            TransitionError::NotFound(booking_ref) => PaymentError::UnknownBooking(booking_ref),
            TransitionError::Port(err) => PaymentError::Store(err),
        }
    }
}
