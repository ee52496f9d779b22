//! API configuration

use config::{Config, ConfigError, Environment, Map};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use core_kernel::{Currency, MoneyError};
use domain_notification::PushCredentials;
use domain_payment::{GatewayCredentials, OrchestratorConfig};

const ENV_PREFIX: &str = "API";

/// API configuration
///
/// Every field falls back to its default when the matching `API_*`
/// environment variable is absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for staff authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// PostgreSQL URL; in-memory stores are used when empty
    pub database_url: String,
    /// Log filter directive, e.g. `info` or `domain_payment=debug`
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,

    /// Public URL of the admin app, used to derive callback and return URLs
    pub app_url: String,
    pub gateway_base_url: String,
    pub gateway_merchant_id: String,
    pub gateway_token: String,
    pub gateway_timeout_secs: u64,
    /// Shared secret for callback signatures
    pub callback_secret: String,
    /// ISO code of the currency booking amounts are quoted in
    pub currency: String,
    pub max_attempts: u32,
    pub intent_ttl_hours: i64,
    /// In-process sweep period; 0 leaves sweeping to an external scheduler
    pub sweep_interval_secs: u64,

    /// Push service `messages:send` URL
    pub push_endpoint: String,
    pub push_token: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: String::new(),
            log_level: "info".to_string(),
            log_json: false,
            app_url: "http://localhost:8080".to_string(),
            gateway_base_url: String::new(),
            gateway_merchant_id: String::new(),
            gateway_token: String::new(),
            gateway_timeout_secs: 10,
            callback_secret: String::new(),
            currency: "USD".to_string(),
            max_attempts: 5,
            intent_ttl_hours: 24,
            sweep_interval_secs: 0,
            push_endpoint: String::new(),
            push_token: String::new(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables
    ///
    /// Values stay strings until serde converts them per field, so string
    /// settings such as merchant ids keep their leading zeros.
    ///
    /// # Errors
    ///
    /// Returns the `ConfigError` of the first variable that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    /// Loads configuration from the given `API_*` variables only
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Map<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_url(&self) -> Option<&str> {
        Some(self.database_url.trim()).filter(|url| !url.is_empty())
    }

    pub fn gateway_credentials(&self) -> GatewayCredentials {
        GatewayCredentials::new(
            self.gateway_base_url.clone(),
            self.gateway_merchant_id.clone(),
            self.gateway_token.clone(),
        )
        .with_timeout(Duration::from_secs(self.gateway_timeout_secs))
    }

    pub fn push_credentials(&self) -> PushCredentials {
        PushCredentials::new(self.push_endpoint.clone(), self.push_token.clone())
    }

    /// Orchestrator tunables derived from this configuration
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::UnknownCurrency` if `currency` is not supported.
    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig, MoneyError> {
        Ok(OrchestratorConfig {
            max_attempts: self.max_attempts,
            intent_ttl: chrono::Duration::hours(self.intent_ttl_hours),
            gateway_timeout: Duration::from_secs(self.gateway_timeout_secs),
            currency: Currency::from_str(&self.currency)?,
            ..OrchestratorConfig::for_app_url(&self.app_url)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_config_derives_urls() {
        let config = ApiConfig {
            app_url: "https://admin.example/".to_string(),
            currency: "KWD".to_string(),
            max_attempts: 3,
            ..ApiConfig::default()
        };

        let orchestrator = config.orchestrator_config().unwrap();

        assert_eq!(orchestrator.callback_url, "https://admin.example/api/payment/callback");
        assert_eq!(orchestrator.return_url, "https://admin.example/payment/success");
        assert_eq!(orchestrator.currency, Currency::KWD);
        assert_eq!(orchestrator.max_attempts, 3);
    }

    #[test]
    fn test_unknown_currency_is_rejected() {
        let config = ApiConfig {
            currency: "XYZ".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.orchestrator_config().is_err());
    }

    #[test]
    fn test_env_values_are_converted_per_field() {
        let config = ApiConfig::from_vars([
            ("API_PORT", "9090"),
            ("API_LOG_JSON", "true"),
            ("API_MAX_ATTEMPTS", "3"),
            ("API_GATEWAY_MERCHANT_ID", "00123"),
            ("API_CALLBACK_SECRET", "0042"),
        ])
        .unwrap();

        assert_eq!(config.port, 9090);
        assert!(config.log_json);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.gateway_merchant_id, "00123");
        assert_eq!(config.callback_secret, "0042");
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_unparseable_value_is_an_error() {
        let result = ApiConfig::from_vars([("API_PORT", "abc"), ("API_JWT_SECRET", "real-secret")]);

        assert!(result.is_err());
    }

    #[test]
    fn test_no_vars_yields_defaults() {
        let config = ApiConfig::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.currency, "USD");
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = ApiConfig {
            database_url: "  ".to_string(),
            ..ApiConfig::default()
        };
        assert_eq!(config.database_url(), None);
    }
}
