//! HTTP payment gateway adapter
//!
//! Talks to the hosted gateway's REST API with reqwest:
//!
//! - `POST {base}/payment/initiate?id=&amount=&phone=&email=&backend_url=&frontend_url=&custom_ref=`
//!   answers `{ "url": "...", "id"?: "..." }`
//! - `POST {base}/receipt/transaction?store_id=&custom_ref=`
//!   answers `{ "result": "success" | ..., ... }`
//!
//! Both calls carry the merchant bearer token and the configured timeout.
//! Status mapping:
//! - missing credentials -> `GatewayError::Misconfigured`, no request sent
//! - timeout or connection failure -> `GatewayError::Unreachable`
//! - 404 on receipt lookup -> `VerificationOutcome::NotFound`
//! - any other non-2xx, or a 2xx without `url` -> `GatewayError::Rejected`

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use core_kernel::{BookingRef, DomainPort};

use crate::gateway::{
    GatewayCredentials, GatewayError, GatewayInitiateRequest, GatewayInitiateResponse,
    GatewayVerification, PaymentGateway, VerificationOutcome,
};

/// Longest gateway body excerpt kept on a rejection
const BODY_EXCERPT_LEN: usize = 512;

/// reqwest-backed [`PaymentGateway`]
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    credentials: GatewayCredentials,
    client: reqwest::Client,
}

impl HttpGatewayClient {
    /// Builds a client whose requests time out after `credentials.timeout`
    pub fn new(credentials: GatewayCredentials) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(credentials.timeout)
            .build()
            .map_err(|e| GatewayError::Misconfigured(format!("http client: {}", e)))?;
        Ok(Self { credentials, client })
    }

    pub fn credentials(&self) -> &GatewayCredentials {
        &self.credentials
    }

    fn ensure_configured(&self) -> Result<(), GatewayError> {
        match self.credentials.missing_field() {
            Some(field) => Err(GatewayError::Misconfigured(format!("missing {}", field))),
            None => Ok(()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.credentials.base_url.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, GatewayError> {
        let url = self.endpoint(path);
        debug!(url = %url, "Calling payment gateway");

        self.client
            .post(&url)
            .query(query)
            .bearer_auth(&self.credentials.bearer_token)
            .header(ACCEPT, "application/json")
            .timeout(self.credentials.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Unreachable(format!(
                "timed out after {}ms",
                self.credentials.timeout.as_millis()
            ))
        } else {
            GatewayError::Unreachable(err.to_string())
        }
    }

    async fn rejected(&self, response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(BODY_EXCERPT_LEN)
            .collect();
        warn!(status, body = %body, "Payment gateway rejected request");
        GatewayError::Rejected { status, body }
    }
}

impl DomainPort for HttpGatewayClient {}

#[async_trait]
impl PaymentGateway for HttpGatewayClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn initiate(
        &self,
        request: GatewayInitiateRequest,
    ) -> Result<GatewayInitiateResponse, GatewayError> {
        self.ensure_configured()?;

        let amount = request.amount.to_major_string();
        let phone = request.phone.clone().unwrap_or_default();
        let response = self
            .post(
                "payment/initiate",
                &[
                    ("id", self.credentials.merchant_id.as_str()),
                    ("amount", amount.as_str()),
                    ("phone", phone.as_str()),
                    ("email", request.email.as_str()),
                    ("backend_url", request.callback_url.as_str()),
                    ("frontend_url", request.return_url.as_str()),
                    ("custom_ref", request.booking_ref.as_str()),
                ],
            )
            .await?;

        if !response.status().is_success() {
            return Err(self.rejected(response).await);
        }

        let status = response.status().as_u16();
        let raw: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Unreachable(format!("unreadable initiate response: {}", e)))?;

        let redirect_url = raw
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Rejected {
                status,
                body: "response has no payment url".to_string(),
            })?;
        let gateway_ref = raw.get("id").and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Ok(GatewayInitiateResponse {
            redirect_url,
            gateway_ref,
            raw,
        })
    }

    async fn verify(&self, booking_ref: &BookingRef) -> Result<GatewayVerification, GatewayError> {
        self.ensure_configured()?;

        let response = self
            .post(
                "receipt/transaction",
                &[
                    ("store_id", self.credentials.merchant_id.as_str()),
                    ("custom_ref", booking_ref.as_str()),
                ],
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            let raw = serde_json::from_str(&body).unwrap_or(Value::String(body));
            return Ok(GatewayVerification {
                outcome: VerificationOutcome::NotFound,
                raw,
            });
        }
        if !response.status().is_success() {
            return Err(self.rejected(response).await);
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Unreachable(format!("unreadable receipt response: {}", e)))?;
        let result = raw.get("result").and_then(Value::as_str).unwrap_or_default();

        Ok(GatewayVerification {
            outcome: VerificationOutcome::from_result_code(result),
            raw,
        })
    }
}
