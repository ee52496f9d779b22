//! Test Data Builders
//!
//! Builders let a test set only the fields it cares about. Intents built in a
//! resolved state get a matching verification record unless one is supplied.

use chrono::{DateTime, Utc};
use core_kernel::{BookingRef, Money};
use domain_payment::{
    InitiatePayment, IntentState, PaymentIntent, VerificationRecord, VerificationSource,
};
use serde_json::json;

use crate::fixtures::{BookingFixtures, MoneyFixtures, PayerFixtures};

/// Builder for payment intents in any lifecycle state
pub struct PaymentIntentBuilder {
    booking_ref: BookingRef,
    amount: Money,
    email: String,
    phone: Option<String>,
    state: IntentState,
    attempts: u32,
    redirect_url: Option<String>,
    gateway_ref: Option<String>,
    last_error: Option<String>,
    verification: Option<VerificationRecord>,
    created_at: Option<DateTime<Utc>>,
}

impl Default for PaymentIntentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentIntentBuilder {
    /// A fresh `Created` intent for booking `B1` over 100.00 USD
    pub fn new() -> Self {
        Self {
            booking_ref: BookingFixtures::primary(),
            amount: MoneyFixtures::usd_100(),
            email: PayerFixtures::email().to_string(),
            phone: None,
            state: IntentState::Created,
            attempts: 0,
            redirect_url: None,
            gateway_ref: None,
            last_error: None,
            verification: None,
            created_at: None,
        }
    }

    pub fn booking(mut self, booking_ref: BookingRef) -> Self {
        self.booking_ref = booking_ref;
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// `GatewayPending` with a session URL and one attempt
    pub fn pending(mut self, redirect_url: impl Into<String>) -> Self {
        self.state = IntentState::GatewayPending;
        self.redirect_url = Some(redirect_url.into());
        self.gateway_ref = Some(self.booking_ref.to_string());
        self.attempts = self.attempts.max(1);
        self
    }

    /// `GatewayFailed` after `attempts` failed initiations
    pub fn failed(mut self, attempts: u32, error: impl Into<String>) -> Self {
        self.state = IntentState::GatewayFailed;
        self.attempts = attempts;
        self.last_error = Some(error.into());
        self
    }

    pub fn state(mut self, state: IntentState) -> Self {
        self.state = state;
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn verification(mut self, record: VerificationRecord) -> Self {
        self.verification = Some(record);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn build(self) -> PaymentIntent {
        let mut intent = PaymentIntent::new(self.booking_ref, self.amount, self.email, self.phone);
        intent.state = self.state;
        intent.attempts = self.attempts;
        intent.redirect_url = self.redirect_url;
        intent.gateway_ref = self.gateway_ref;
        intent.last_error = self.last_error;
        intent.verification = self.verification.or_else(|| match self.state {
            IntentState::Verified => Some(VerificationRecord::new(
                "success",
                VerificationSource::Verify,
                json!({ "result": "success" }),
            )),
            IntentState::VerificationFailed => Some(VerificationRecord::new(
                "failed",
                VerificationSource::Verify,
                json!({ "result": "failed" }),
            )),
            _ => None,
        });
        if let Some(created_at) = self.created_at {
            intent.created_at = created_at;
            intent.updated_at = created_at;
        }
        intent
    }
}

/// Builder for `initiate` requests
pub struct InitiatePaymentBuilder {
    booking_ref: String,
    amount: Money,
    email: String,
    phone: Option<String>,
}

impl Default for InitiatePaymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InitiatePaymentBuilder {
    pub fn new() -> Self {
        Self {
            booking_ref: BookingFixtures::PRIMARY.to_string(),
            amount: MoneyFixtures::usd_100(),
            email: PayerFixtures::email().to_string(),
            phone: None,
        }
    }

    pub fn booking(mut self, booking_ref: impl Into<String>) -> Self {
        self.booking_ref = booking_ref.into();
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn build(self) -> InitiatePayment {
        let request = InitiatePayment::new(self.booking_ref, self.amount, self.email);
        match self.phone {
            Some(phone) => request.with_phone(phone),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TemporalFixtures;

    #[test]
    fn test_default_intent_is_created() {
        let intent = PaymentIntentBuilder::new().build();
        assert_eq!(intent.state, IntentState::Created);
        assert_eq!(intent.attempts, 0);
        assert!(intent.verification.is_none());
    }

    #[test]
    fn test_verified_intent_gets_success_record() {
        let intent = PaymentIntentBuilder::new()
            .pending("https://pay/x")
            .state(IntentState::Verified)
            .build();

        assert!(intent.is_verified());
        assert_eq!(intent.redirect_url.as_deref(), Some("https://pay/x"));
    }

    #[test]
    fn test_created_at_backdates_intent() {
        let at = TemporalFixtures::hours_ago(48);
        let intent = PaymentIntentBuilder::new().created_at(at).build();
        assert_eq!(intent.created_at, at);
    }

    #[test]
    fn test_initiate_builder_sets_phone() {
        let request = InitiatePaymentBuilder::new().phone("+1555").build();
        assert_eq!(request.phone.as_deref(), Some("+1555"));
    }
}
