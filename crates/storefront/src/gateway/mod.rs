//! Payment gateway client.
//!
//! The gateway is a third-party hosted payment UI. From the checkout's point
//! of view it is a single async call, [`PaymentGateway::open`], that resolves
//! exactly once with a [`GatewayOutcome`].

mod channel;
mod signature;

pub use channel::{ChannelGateway, PaymentPrompt};
pub use signature::{SignatureError, sign_payment, verify_payment_signature};

use async_trait::async_trait;
use lumina_core::{Amount, Currency, Email, OrderId, PaymentId};
use serde::Serialize;

use crate::config::MerchantDisplay;

/// Reason reported when the user closes the payment UI without paying.
pub const CANCELLED_REASON: &str = "cancelled";

/// Customer details pre-filled into the payment form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: Email,
    /// Phone with country code, as the gateway's `contact` field expects.
    pub contact: String,
}

/// Everything the hosted payment UI needs to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayConfig {
    /// Publishable gateway key id.
    pub key_id: String,
    /// Amount in minor units.
    pub amount: Amount,
    pub currency: Currency,
    pub order_id: OrderId,
    pub merchant: MerchantDisplay,
    pub prefill: Prefill,
}

/// A successful payment as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub payment_id: PaymentId,
    /// Order the gateway charged against.
    pub order_id: OrderId,
    /// Hex HMAC over `order_id|payment_id`, when the gateway provides one.
    pub signature: Option<String>,
}

/// Result of one gateway session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Success(PaymentConfirmation),
    /// Initialization failure, cancellation, or decline.
    Failed(String),
}

impl GatewayOutcome {
    /// Outcome for a UI closed without paying.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::Failed(CANCELLED_REASON.to_string())
    }
}

/// A hosted payment UI.
///
/// Implementations must resolve every call exactly once and must not retry.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open the payment UI and wait for it to resolve.
    async fn open(&self, config: GatewayConfig) -> GatewayOutcome;
}
