//! Seams between the orchestrator and the backend.
//!
//! The orchestrator only knows these traits; [`BackendClient`] implements
//! order creation, and each commit target decides what "recording the
//! payment" means for its flow.

use async_trait::async_trait;
use lumina_core::{Amount, Currency, CustomerId, PaymentMethod, UserDraft};

use crate::backend::{
    ApiError, BackendClient, CheckoutItem, MarketplaceCheckoutRequest, MarketplaceOrder,
    PaymentOrder, RegisterRequest,
};
use crate::gateway::PaymentConfirmation;

/// Where a confirmed subscription sends the customer.
pub const SUBSCRIPTION_REDIRECT: &str = "/dashboard";

/// Where a confirmed marketplace order sends the customer.
pub const ORDERS_REDIRECT: &str = "/orders";

/// Reserves payment orders.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Reserve an order for `amount`; `receipt` identifies the attempt.
    async fn create_order(
        &self,
        amount: Amount,
        currency: Currency,
        receipt: &str,
    ) -> Result<PaymentOrder, ApiError>;
}

#[async_trait]
impl OrderService for BackendClient {
    async fn create_order(
        &self,
        amount: Amount,
        currency: Currency,
        receipt: &str,
    ) -> Result<PaymentOrder, ApiError> {
        Self::create_order(self, amount, currency, Some(receipt)).await
    }
}

/// What a successful commit produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitReceipt {
    /// The subscription was registered.
    Registered,
    /// The marketplace order was placed.
    Order(MarketplaceOrder),
}

/// Records a confirmed payment.
///
/// Only called after the gateway confirmed a payment for the attempt's
/// order.
#[async_trait]
pub trait CommitService: Send + Sync {
    async fn commit(
        &self,
        draft: &UserDraft,
        payment: &PaymentConfirmation,
    ) -> Result<CommitReceipt, ApiError>;

    /// Destination signalled to the caller on success.
    fn redirect_to(&self) -> &str;
}

/// Subscription registration (`POST /register`).
#[derive(Debug, Clone)]
pub struct SubscriptionCommit {
    backend: BackendClient,
}

impl SubscriptionCommit {
    #[must_use]
    pub const fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CommitService for SubscriptionCommit {
    async fn commit(
        &self,
        draft: &UserDraft,
        payment: &PaymentConfirmation,
    ) -> Result<CommitReceipt, ApiError> {
        let request = RegisterRequest {
            name: draft.name.as_str(),
            email: &draft.email,
            phone: draft.phone.as_str(),
            payment_id: &payment.payment_id,
            order_id: Some(&payment.order_id),
            signature: payment.signature.as_deref(),
        };
        self.backend.register(&request).await?;
        Ok(CommitReceipt::Registered)
    }

    fn redirect_to(&self) -> &str {
        SUBSCRIPTION_REDIRECT
    }
}

/// Marketplace order placement for a prepaid cart.
#[derive(Debug, Clone)]
pub struct MarketplaceCommit {
    backend: BackendClient,
    customer_id: CustomerId,
    items: Vec<CheckoutItem>,
    payment_method: PaymentMethod,
    shipping_address: String,
}

impl MarketplaceCommit {
    #[must_use]
    pub const fn new(
        backend: BackendClient,
        customer_id: CustomerId,
        items: Vec<CheckoutItem>,
        payment_method: PaymentMethod,
        shipping_address: String,
    ) -> Self {
        Self {
            backend,
            customer_id,
            items,
            payment_method,
            shipping_address,
        }
    }
}

#[async_trait]
impl CommitService for MarketplaceCommit {
    async fn commit(
        &self,
        _draft: &UserDraft,
        payment: &PaymentConfirmation,
    ) -> Result<CommitReceipt, ApiError> {
        let request = MarketplaceCheckoutRequest {
            customer_id: self.customer_id,
            items: &self.items,
            payment_method: self.payment_method,
            shipping_address: &self.shipping_address,
            payment_id: Some(&payment.payment_id),
        };
        let order = self.backend.marketplace_checkout(&request).await?;
        Ok(CommitReceipt::Order(order))
    }

    fn redirect_to(&self) -> &str {
        ORDERS_REDIRECT
    }
}
