//! Payment gateway port
//!
//! The gateway hosts the payment page and reports settlement results. The
//! bridge talks to it through [`PaymentGateway`] so the orchestrator can be
//! driven by the HTTP adapter in production and a scripted double in tests.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use core_kernel::{BookingRef, DomainPort, Money};

use crate::intent::{normalize_result_code, SUCCESS_RESULT};

/// Credentials and endpoint for the hosted payment gateway
#[derive(Clone)]
pub struct GatewayCredentials {
    pub base_url: String,
    pub merchant_id: String,
    pub bearer_token: String,
    /// Upper bound on every outbound call
    pub timeout: Duration,
}

impl GatewayCredentials {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(
        base_url: impl Into<String>,
        merchant_id: impl Into<String>,
        bearer_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            merchant_id: merchant_id.into(),
            bearer_token: bearer_token.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Names the first missing credential, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.base_url.trim().is_empty() {
            Some("base_url")
        } else if self.merchant_id.trim().is_empty() {
            Some("merchant_id")
        } else if self.bearer_token.trim().is_empty() {
            Some("bearer_token")
        } else {
            None
        }
    }
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("base_url", &self.base_url)
            .field("merchant_id", &self.merchant_id)
            .field("bearer_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Request to open a hosted payment session
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayInitiateRequest {
    pub booking_ref: BookingRef,
    pub amount: Money,
    pub email: String,
    pub phone: Option<String>,
    /// Server-to-server notification URL
    pub callback_url: String,
    /// Where the payer's browser lands afterwards
    pub return_url: String,
}

/// Gateway answer to an initiation
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayInitiateResponse {
    pub redirect_url: String,
    /// Gateway-side identifier, when the gateway supplies one
    pub gateway_ref: Option<String>,
    pub raw: serde_json::Value,
}

/// What the gateway knows about a payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Success,
    Failed(String),
    NotFound,
}

impl VerificationOutcome {
    /// Interprets a gateway `result` field
    pub fn from_result_code(code: &str) -> Self {
        let code = normalize_result_code(code);
        if code == SUCCESS_RESULT {
            VerificationOutcome::Success
        } else if code.is_empty() {
            VerificationOutcome::Failed("unknown".to_string())
        } else {
            VerificationOutcome::Failed(code)
        }
    }

    pub fn result_code(&self) -> &str {
        match self {
            VerificationOutcome::Success => SUCCESS_RESULT,
            VerificationOutcome::Failed(code) => code,
            VerificationOutcome::NotFound => "not_found",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, VerificationOutcome::Success)
    }
}

/// Gateway receipt lookup result
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayVerification {
    pub outcome: VerificationOutcome,
    pub raw: serde_json::Value,
}

/// Failures talking to the gateway
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Credentials are missing; no call was attempted
    #[error("gateway misconfigured: {0}")]
    Misconfigured(String),

    /// Timeout, connection failure, or unreadable response
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// Gateway answered with a non-success status or unusable body
    #[error("gateway rejected request with status {status}")]
    Rejected { status: u16, body: String },
}

/// Port for the hosted payment gateway
#[async_trait]
pub trait PaymentGateway: DomainPort {
    /// Short adapter name for logs
    fn name(&self) -> &'static str;

    /// Opens a payment session and returns the hosted page URL
    async fn initiate(
        &self,
        request: GatewayInitiateRequest,
    ) -> Result<GatewayInitiateResponse, GatewayError>;

    /// Looks up the receipt for a booking; a 404 is `NotFound`, not an error
    async fn verify(&self, booking_ref: &BookingRef) -> Result<GatewayVerification, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_reports_first_gap() {
        let creds = GatewayCredentials::new("https://gw.test", "", "token");
        assert_eq!(creds.missing_field(), Some("merchant_id"));
        assert_eq!(GatewayCredentials::new("", "", "").missing_field(), Some("base_url"));
        assert_eq!(GatewayCredentials::new("https://gw.test", "m", "t").missing_field(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = GatewayCredentials::new("https://gw.test", "m", "secret-token");
        assert!(!format!("{:?}", creds).contains("secret-token"));
    }

    #[test]
    fn test_outcome_from_result_code() {
        assert_eq!(VerificationOutcome::from_result_code("Success"), VerificationOutcome::Success);
        assert_eq!(
            VerificationOutcome::from_result_code("declined"),
            VerificationOutcome::Failed("declined".to_string())
        );
        assert_eq!(VerificationOutcome::NotFound.result_code(), "not_found");
    }
}
