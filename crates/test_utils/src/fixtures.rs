//! Pre-built Test Fixtures
//!
//! Consistent, predictable values for unit and API tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{BookingRef, Currency, Money};
use domain_payment::{GatewayInitiateResponse, GatewayVerification, VerificationOutcome};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// 100.00 USD
    pub fn usd_100() -> Money {
        Money::from_minor(10_000, Currency::USD)
    }

    /// 125.50 USD, a typical nightly rate
    pub fn usd_nightly() -> Money {
        Money::from_minor(12_550, Currency::USD)
    }

    /// 12.345 KWD (three decimal places)
    pub fn kwd_12_345() -> Money {
        Money::from_major(dec!(12.345), Currency::KWD).unwrap_or_else(|_| Money::zero(Currency::KWD))
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }
}

/// Fixture for booking references
pub struct BookingFixtures;

impl BookingFixtures {
    pub const PRIMARY: &'static str = "B1";
    pub const SECONDARY: &'static str = "B2";

    pub fn primary() -> BookingRef {
        Self::parse(Self::PRIMARY)
    }

    pub fn secondary() -> BookingRef {
        Self::parse(Self::SECONDARY)
    }

    /// A reference no other test uses
    pub fn unique() -> BookingRef {
        Self::parse(&format!("BK-{}", Uuid::new_v4().simple()))
    }

    fn parse(value: &str) -> BookingRef {
        BookingRef::parse(value).expect("fixture booking refs are valid")
    }
}

/// Fixture for payer contact details
pub struct PayerFixtures;

impl PayerFixtures {
    pub fn email() -> &'static str {
        "a@x.com"
    }

    pub fn phone() -> &'static str {
        "+96550000000"
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Fixed "now" for sweep tests (June 1, 2024, noon UTC)
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .expect("fixture timestamp is valid")
    }

    /// `hours` before [`TemporalFixtures::now`]
    pub fn hours_ago(hours: i64) -> DateTime<Utc> {
        Self::now() - Duration::hours(hours)
    }
}

/// Shared secrets used across API tests
pub struct SecretFixtures;

impl SecretFixtures {
    pub const CALLBACK_SECRET: &'static str = "callback-test-secret";
    pub const JWT_SECRET: &'static str = "jwt-test-secret";
}

/// Canned gateway responses
pub struct GatewayFixtures;

impl GatewayFixtures {
    pub fn session(url: &str, gateway_ref: Option<&str>) -> GatewayInitiateResponse {
        GatewayInitiateResponse {
            redirect_url: url.to_string(),
            gateway_ref: gateway_ref.map(str::to_string),
            raw: json!({ "url": url, "id": gateway_ref }),
        }
    }

    pub fn receipt(outcome: VerificationOutcome) -> GatewayVerification {
        GatewayVerification {
            raw: json!({ "result": outcome.result_code() }),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_fixtures() {
        assert_eq!(MoneyFixtures::usd_100().to_major_string(), "100");
        assert_eq!(MoneyFixtures::kwd_12_345().minor_units(), 12_345);
        assert!(MoneyFixtures::usd_zero().is_zero());
    }

    #[test]
    fn test_unique_bookings_differ() {
        assert_ne!(BookingFixtures::unique(), BookingFixtures::unique());
    }

    #[test]
    fn test_receipt_carries_result_code() {
        let receipt = GatewayFixtures::receipt(VerificationOutcome::Failed("declined".into()));
        assert_eq!(receipt.raw["result"], "declined");
    }
}
