//! Request and response payloads for the Lumina backend.

use lumina_core::{
    Amount, ChatRole, Currency, CustomerId, Email, MarketplaceOrderId, OrderId, PaymentId,
    PaymentMethod, Price, ProductId, UserRole, VendorId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Payment orders
// =============================================================================

/// `POST /create-order` body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest<'a> {
    pub amount: Amount,
    pub currency: Currency,
    /// Attempt id, so the backend can tie the order to one checkout session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<&'a str>,
}

/// `POST /create-order` success body, before validation.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateOrderResponse {
    #[serde(default)]
    pub order: Option<OrderPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// A payment order reserved by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Gateway order id (e.g. `order_abc`).
    pub id: OrderId,
    /// Amount the gateway will charge, in minor units.
    pub amount: Amount,
    /// Currency the gateway will charge in.
    pub currency: Currency,
}

// =============================================================================
// Registration / commit
// =============================================================================

/// `POST /register` body.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub phone: &'a str,
    pub payment_id: &'a PaymentId,
    /// Order the payment was made against, for server-side binding checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<&'a OrderId>,
    /// Gateway signature over `order_id|payment_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<&'a str>,
}

/// Acknowledgement that the backend recorded a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAck {
    pub confirmed: bool,
}

// =============================================================================
// Users
// =============================================================================

/// `POST /login` body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a Email,
    pub password: &'a str,
}

/// `POST /login` success body.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub data: Option<LoginData>,
}

/// Identity returned by a successful backend login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub token: Option<String>,
}

/// A user record as stored by the backend.
///
/// Only the fields the client displays are typed; anything else the backend
/// sends is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub subscription_status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub user: UserRecord,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

// =============================================================================
// Marketplace
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in the store currency's standard unit.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock_qty: i64,
    #[serde(default)]
    pub images: Option<String>,
    pub vendor_id: VendorId,
}

impl Product {
    /// Unit price in the given store currency.
    #[must_use]
    pub const fn unit_price(&self, currency: Currency) -> Price {
        Price::new(self.price, currency)
    }

    /// Returns `true` if at least `quantity` units are in stock.
    #[must_use]
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock_qty >= i64::from(quantity)
    }
}

/// A cart line as the checkout endpoint expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// `POST /api/p1/marketplace/checkout` body.
#[derive(Debug, Clone, Serialize)]
pub struct MarketplaceCheckoutRequest<'a> {
    pub customer_id: CustomerId,
    pub items: &'a [CheckoutItem],
    pub payment_method: PaymentMethod,
    pub shipping_address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<&'a PaymentId>,
}

/// Order confirmation from the marketplace checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceOrder {
    pub order_id: MarketplaceOrderId,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

// =============================================================================
// Chat & analytics
// =============================================================================

/// One turn of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// `POST /chat` body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub model: &'a str,
    pub email: Option<&'a Email>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub response: String,
}

/// `POST /admin/analyze` body.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResponse {
    #[serde(default)]
    pub analysis: serde_json::Value,
}

/// Result of an admin analytics query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis(pub serde_json::Value);

impl std::fmt::Display for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            serde_json::Value::String(text) => f.write_str(text),
            serde_json::Value::Null => f.write_str("(no analysis returned)"),
            other => write!(f, "{other:#}"),
        }
    }
}
