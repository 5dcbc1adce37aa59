//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LUMINA_API_BASE_URL` - Base URL of the Lumina backend (e.g. `http://localhost:8000`)
//!
//! ## Optional
//! - `LUMINA_API_TOKEN` - Bearer token sent with every backend request
//! - `LUMINA_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `LUMINA_PAYMENT_TIMEOUT_SECS` - How long an open payment session may wait (default: 300)
//! - `LUMINA_GATEWAY_KEY_ID` - Publishable payment gateway key (default: empty)
//! - `LUMINA_MERCHANT_NAME` - Merchant name shown in the gateway (default: Lumina)
//! - `LUMINA_PLAN_DESCRIPTION` - Subscription line shown in the gateway (default: Pro Plan Subscription)
//! - `LUMINA_THEME_COLOR` - Gateway theme colour (default: #4F46E5)
//! - `LUMINA_PLAN_AMOUNT` - Subscription price in minor units (default: 49900)
//! - `LUMINA_CURRENCY` - ISO 4217 code for subscriptions and the catalog (default: INR)
//! - `LUMINA_CHAT_MODEL` - Model name passed to `/chat` (default: phi3)
//! - `LUMINA_STATE_PATH` - Local session/cart file (default: .lumina/state.json)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

use lumina_core::{Amount, Currency};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

const DEFAULT_PLAN_AMOUNT: Amount = match NonZeroU64::new(49_900) {
    Some(minor_units) => Amount::from_nonzero(minor_units),
    None => panic!("default plan amount must be positive"),
};

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration
    pub backend: BackendConfig,
    /// Checkout and payment gateway configuration
    pub checkout: CheckoutConfig,
    /// Model name for the chat widget
    pub chat_model: String,
    /// Path of the local state file (session + cart)
    pub state_path: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Backend API configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, always ending in `/` so relative joins stay under it
    pub base_url: Url,
    /// Optional bearer token
    pub api_token: Option<SecretString>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl BackendConfig {
    /// Build a backend configuration for a base URL with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("LUMINA_API_BASE_URL", base_url)?,
            api_token: None,
            request_timeout: Duration::from_secs(30),
        })
    }
}

/// What the payment gateway shows about the merchant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MerchantDisplay {
    /// Merchant name in the gateway header
    pub name: String,
    /// Line item description
    pub description: String,
    /// Theme colour (CSS hex)
    pub theme_color: String,
}

impl Default for MerchantDisplay {
    fn default() -> Self {
        Self {
            name: "Lumina".to_string(),
            description: "Pro Plan Subscription".to_string(),
            theme_color: "#4F46E5".to_string(),
        }
    }
}

/// Checkout and payment gateway configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Publishable gateway key id (safe to expose to the payment widget)
    pub gateway_key_id: String,
    /// Merchant branding for the gateway
    pub merchant: MerchantDisplay,
    /// Subscription price
    pub plan_amount: Amount,
    /// Currency for subscriptions and catalog prices
    pub currency: Currency,
    /// Upper bound on how long a payment session stays open
    pub payment_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            gateway_key_id: String::new(),
            merchant: MerchantDisplay::default(),
            plan_amount: DEFAULT_PLAN_AMOUNT,
            currency: Currency::INR,
            payment_timeout: Duration::from_secs(300),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let backend = BackendConfig {
            base_url: parse_base_url(
                "LUMINA_API_BASE_URL",
                &env.required("LUMINA_API_BASE_URL")?,
            )?,
            api_token: env
                .optional("LUMINA_API_TOKEN")
                .map(|token| validated_secret(token, "LUMINA_API_TOKEN"))
                .transpose()?,
            request_timeout: env.seconds("LUMINA_HTTP_TIMEOUT_SECS", 30)?,
        };

        let defaults = MerchantDisplay::default();
        let merchant = MerchantDisplay {
            name: env.or_default("LUMINA_MERCHANT_NAME", &defaults.name),
            description: env.or_default("LUMINA_PLAN_DESCRIPTION", &defaults.description),
            theme_color: env.or_default("LUMINA_THEME_COLOR", &defaults.theme_color),
        };

        let plan_amount = env
            .or_default("LUMINA_PLAN_AMOUNT", "49900")
            .parse::<u64>()
            .map_err(|e| e.to_string())
            .and_then(|v| Amount::new(v).map_err(|e| e.to_string()))
            .map_err(|e| ConfigError::InvalidEnvVar("LUMINA_PLAN_AMOUNT".to_string(), e))?;

        let currency = Currency::parse(&env.or_default("LUMINA_CURRENCY", "INR"))
            .map_err(|e| ConfigError::InvalidEnvVar("LUMINA_CURRENCY".to_string(), e.to_string()))?;

        let checkout = CheckoutConfig {
            gateway_key_id: env.or_default("LUMINA_GATEWAY_KEY_ID", ""),
            merchant,
            plan_amount,
            currency,
            payment_timeout: env.seconds("LUMINA_PAYMENT_TIMEOUT_SECS", 300)?,
        };

        Ok(Self {
            backend,
            checkout,
            chat_model: env.or_default("LUMINA_CHAT_MODEL", "phi3"),
            state_path: PathBuf::from(env.or_default("LUMINA_STATE_PATH", ".lumina/state.json")),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get a required variable; blank values count as missing.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a positive number of seconds.
    fn seconds(&self, key: &str, default: u64) -> Result<Duration, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(Duration::from_secs(default));
        };
        match raw.trim().parse::<u64>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be greater than zero".to_string(),
            )),
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        }
    }
}

/// Parse a base URL, forcing a trailing slash so `Url::join` appends paths.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

fn validated_secret(value: String, var_name: &str) -> Result<SecretString, ConfigError> {
    validate_secret_strength(&value, var_name)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_base_url() {
        let err = StorefrontConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "LUMINA_API_BASE_URL"));
    }

    #[test]
    fn test_defaults() {
        let config =
            StorefrontConfig::from_lookup(lookup(&[("LUMINA_API_BASE_URL", "http://localhost:8000")]))
                .unwrap();

        assert_eq!(config.backend.base_url.as_str(), "http://localhost:8000/");
        assert!(config.backend.api_token.is_none());
        assert_eq!(config.backend.request_timeout, Duration::from_secs(30));
        assert_eq!(config.checkout.payment_timeout, Duration::from_secs(300));
        assert_eq!(config.checkout.plan_amount.minor_units(), 49_900);
        assert_eq!(config.checkout.currency, Currency::INR);
        assert_eq!(config.checkout.merchant, MerchantDisplay::default());
        assert_eq!(config.chat_model, "phi3");
        assert_eq!(config.state_path, PathBuf::from(".lumina/state.json"));
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let config = StorefrontConfig::from_lookup(lookup(&[(
            "LUMINA_API_BASE_URL",
            "https://api.lumina.test/v2",
        )]))
        .unwrap();
        assert_eq!(
            config.backend.base_url.join("create-order").unwrap().as_str(),
            "https://api.lumina.test/v2/create-order"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = StorefrontConfig::from_lookup(lookup(&[("LUMINA_API_BASE_URL", "ftp://host")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_rejects_zero_plan_amount() {
        let err = StorefrontConfig::from_lookup(lookup(&[
            ("LUMINA_API_BASE_URL", "http://localhost:8000"),
            ("LUMINA_PLAN_AMOUNT", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "LUMINA_PLAN_AMOUNT"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = StorefrontConfig::from_lookup(lookup(&[
            ("LUMINA_API_BASE_URL", "http://localhost:8000"),
            ("LUMINA_PAYMENT_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_rejects_bad_currency() {
        let err = StorefrontConfig::from_lookup(lookup(&[
            ("LUMINA_API_BASE_URL", "http://localhost:8000"),
            ("LUMINA_CURRENCY", "rupees"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "LUMINA_CURRENCY"));
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let err = StorefrontConfig::from_lookup(lookup(&[
            ("LUMINA_API_BASE_URL", "http://localhost:8000"),
            ("LUMINA_API_TOKEN", "your-api-token"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_backend_config_debug_redacts_token() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("LUMINA_API_BASE_URL", "http://localhost:8000"),
            ("LUMINA_API_TOKEN", "tk_9fQ2xLm7Rb4ZpW1s"),
        ]))
        .unwrap();

        let debug_output = format!("{:?}", config.backend);
        assert!(debug_output.contains("localhost:8000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tk_9fQ2xLm7Rb4ZpW1s"));
    }
}
