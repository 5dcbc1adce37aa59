//! Lumina backend REST client.
//!
//! Every call the storefront makes goes through [`BackendClient`]. Responses
//! are classified into [`ApiError`] variants in one place ([`BackendClient::send`])
//! so callers never see raw HTTP. The product catalog is cached using `moka`
//! (5-minute TTL).

mod cache;
mod error;
mod types;

pub use error::{ApiError, ErrorBody};
pub use types::{
    AnalyzeRequest, Analysis, ChatMessage, ChatRequest, CheckoutItem, CommitAck,
    CreateOrderRequest, LoginData, LoginRequest, MarketplaceCheckoutRequest, MarketplaceOrder,
    PaymentOrder, Product, RegisterRequest, UserRecord,
};

use std::sync::Arc;
use std::time::Duration;

use lumina_core::{Amount, Currency, Email, OrderId};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::BackendConfig;

use cache::{CacheKey, CacheValue};
use types::{
    AnalyzeResponse, ChatResponse, CreateOrderResponse, LoginResponse, UserResponse,
    UsersResponse,
};

/// Longest response body excerpt written to logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the Lumina backend.
///
/// Cheap to clone; clones share the connection pool and catalog cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Setup`] if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("lumina-storefront/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                api_token: config.api_token.clone(),
                cache,
            }),
        })
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an endpoint from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        let shown = url.to_string();
        url.path_segments_mut()
            .map_err(|()| ApiError::Setup(format!("base URL cannot have a path: {shown}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, segments: &[&str]) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        Ok(self.authorize(self.inner.client.get(url)))
    }

    fn post<B: serde::Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        Ok(self.authorize(self.inner.client.post(url).json(body)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode a success body.
    ///
    /// Non-2xx statuses, rate limiting, and `{"status": "error"}` envelopes
    /// all become [`ApiError::Rejected`] carrying the backend's message.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: format!("rate limited, retry after {retry_after}s"),
            });
        }

        // Read as text first so failures can be logged with the body
        let response_text = response.text().await?;
        let envelope = serde_json::from_str::<ErrorBody>(&response_text).ok();

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %excerpt(&response_text),
                "Backend returned non-success status"
            );
            let message = envelope
                .as_ref()
                .and_then(ErrorBody::message)
                .unwrap_or_else(|| fallback_message(status, &response_text));
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        if let Some(body) = &envelope
            && body.status.as_deref().is_some_and(|s| s != "success")
        {
            tracing::warn!(
                body = %excerpt(&response_text),
                "Backend reported failure in a success response"
            );
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: body
                    .message()
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&response_text),
                "Failed to parse backend response"
            );
            ApiError::MalformedResponse(e.to_string())
        })
    }

    // =========================================================================
    // Payment orders
    // =========================================================================

    /// Reserve a payment order for `amount` in `currency`.
    ///
    /// The backend's own figures win when the response carries them, since
    /// they are what the gateway will charge.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MalformedResponse`] if the success body lacks an
    /// order id, otherwise the usual network/rejection errors.
    #[instrument(skip(self), fields(amount = %amount, currency = %currency))]
    pub async fn create_order(
        &self,
        amount: Amount,
        currency: Currency,
        receipt: Option<&str>,
    ) -> Result<PaymentOrder, ApiError> {
        let body = CreateOrderRequest {
            amount,
            currency,
            receipt,
        };
        let response: CreateOrderResponse = self.send(self.post(&["create-order"], &body)?).await?;

        let order = response
            .order
            .ok_or_else(|| ApiError::MalformedResponse("response has no order".to_string()))?;

        let id = order
            .id
            .as_deref()
            .and_then(OrderId::parse)
            .ok_or_else(|| ApiError::MalformedResponse("order has no id".to_string()))?;

        let order_amount = match order.amount {
            Some(minor) => Amount::new(minor)
                .map_err(|e| ApiError::MalformedResponse(format!("order amount: {e}")))?,
            None => amount,
        };
        let order_currency = match order.currency.as_deref() {
            Some(code) => Currency::parse(code)
                .map_err(|e| ApiError::MalformedResponse(format!("order currency: {e}")))?,
            None => currency,
        };

        if order_amount != amount || order_currency != currency {
            tracing::warn!(
                order_id = %id,
                requested = %amount,
                reserved = %order_amount,
                reserved_currency = %order_currency,
                "Backend reserved a different amount than requested"
            );
        }

        debug!(order_id = %id, "Payment order created");
        Ok(PaymentOrder {
            id,
            amount: order_amount,
            currency: order_currency,
        })
    }

    /// Record a subscription against a confirmed payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend refuses it.
    #[instrument(skip(self, request), fields(payment_id = %request.payment_id))]
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<CommitAck, ApiError> {
        let _: serde_json::Value = self.send(self.post(&["register"], request)?).await?;
        Ok(CommitAck { confirmed: true })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Check credentials with the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for bad credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) -> Result<LoginData, ApiError> {
        let body = LoginRequest { email, password };
        let response: LoginResponse = self.send(self.post(&["login"], &body)?).await?;
        Ok(response.data.unwrap_or_default())
    }

    /// Fetch the stored record for `email`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] with status 404 for unknown users.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn fetch_user(&self, email: &Email) -> Result<UserRecord, ApiError> {
        let response: UserResponse = self.send(self.get(&["user", email.as_str()])?).await?;
        Ok(response.user)
    }

    /// List every registered user (admin console).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        let response: UsersResponse = self.send(self.get(&["admin", "users"])?).await?;
        Ok(response.users)
    }

    // =========================================================================
    // Marketplace
    // =========================================================================

    /// List catalog products. Cached for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self
            .send(self.get(&["api", "p1", "marketplace", "products"])?)
            .await?;
        let products = Arc::new(products);

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Drop the cached product listing.
    pub async fn invalidate_products(&self) {
        self.inner.cache.invalidate(&CacheKey::Products).await;
    }

    /// Place a marketplace order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for stock problems and other refusals.
    #[instrument(
        skip(self, request),
        fields(items = request.items.len(), method = %request.payment_method)
    )]
    pub async fn marketplace_checkout(
        &self,
        request: &MarketplaceCheckoutRequest<'_>,
    ) -> Result<MarketplaceOrder, ApiError> {
        let order: MarketplaceOrder = self
            .send(self.post(&["api", "p1", "marketplace", "checkout"], request)?)
            .await?;

        // Stock changed; the next listing must come from the backend
        self.invalidate_products().await;
        Ok(order)
    }

    // =========================================================================
    // Chat & analytics
    // =========================================================================

    /// Send the conversation so far and return the assistant's reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, request), fields(turns = request.messages.len(), model = request.model))]
    pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, ApiError> {
        let response: ChatResponse = self.send(self.post(&["chat"], request)?).await?;
        Ok(response.response)
    }

    /// Run a natural-language analytics query.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_analyze(&self, query: &str) -> Result<Analysis, ApiError> {
        let body = AnalyzeRequest { query };
        let response: AnalyzeResponse = self.send(self.post(&["admin", "analyze"], &body)?).await?;
        Ok(Analysis(response.analysis))
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(LOG_BODY_LIMIT).collect()
}

fn fallback_message(status: reqwest::StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.chars().take(200).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendConfig::new(base).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let client = client("http://localhost:8000");
        assert_eq!(
            client.endpoint(&["create-order"]).unwrap().as_str(),
            "http://localhost:8000/create-order"
        );
        assert_eq!(
            client
                .endpoint(&["api", "p1", "marketplace", "products"])
                .unwrap()
                .as_str(),
            "http://localhost:8000/api/p1/marketplace/products"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("https://api.example.com/v1");
        assert_eq!(
            client.endpoint(&["register"]).unwrap().as_str(),
            "https://api.example.com/v1/register"
        );
    }

    #[test]
    fn test_endpoint_rejects_opaque_base() {
        let mut config = BackendConfig::new("http://localhost:8000").unwrap();
        config.base_url = Url::parse("mailto:ops@example.com").unwrap();
        let client = BackendClient::new(&config).unwrap();

        match client.endpoint(&["create-order"]) {
            Err(ApiError::Setup(message)) => {
                assert_eq!(message, "base URL cannot have a path: mailto:ops@example.com");
            }
            other => panic!("expected setup error, got {other:?}"),
        }
    }

    #[test]
    fn test_endpoint_encodes_email_segment() {
        let client = client("http://localhost:8000");
        let url = client.endpoint(&["user", "a/b@example.com"]).unwrap();
        assert_eq!(url.path(), "/user/a%2Fb@example.com");
    }

    #[test]
    fn test_fallback_message() {
        assert_eq!(
            fallback_message(reqwest::StatusCode::BAD_GATEWAY, "  "),
            "Bad Gateway"
        );
        assert_eq!(
            fallback_message(reqwest::StatusCode::BAD_REQUEST, "plain text"),
            "plain text"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let mut config = BackendConfig::new("http://localhost:8000").unwrap();
        config.api_token = Some(SecretString::from("super-secret-token".to_string()));
        let client = BackendClient::new(&config).unwrap();
        assert!(!format!("{client:?}").contains("super-secret-token"));
    }
}
