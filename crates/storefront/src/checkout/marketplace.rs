//! Marketplace cart checkout.
//!
//! Prepaid methods go through the [`CheckoutOrchestrator`] with a
//! [`MarketplaceCommit`] target, so the order is only placed once the gateway
//! confirmed payment. Cash on delivery places the order directly.

use lumina_core::{Currency, CustomerId, PaymentId, PaymentMethod, UserDraft};
use tracing::{info, instrument};

use super::cart::{Cart, ShippingAddress};
use super::error::CheckoutError;
use super::orchestrator::{CheckoutOrchestrator, CheckoutOutcome};
use super::ports::{CommitReceipt, MarketplaceCommit, ORDERS_REDIRECT};
use crate::backend::{BackendClient, MarketplaceCheckoutRequest, MarketplaceOrder};

/// Who is buying and where it goes.
#[derive(Debug, Clone)]
pub struct MarketplaceOrderRequest {
    pub customer_id: CustomerId,
    /// Contact details for the payment form.
    pub draft: UserDraft,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// A placed marketplace order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: MarketplaceOrder,
    /// Gateway payment id for prepaid orders.
    pub payment_id: Option<PaymentId>,
    pub redirect_to: &'static str,
}

/// Check out `cart`, clearing it once the order is placed.
///
/// # Errors
///
/// Returns [`CheckoutError::Validation`] for an empty cart, otherwise the
/// error that ended the attempt. The cart is left untouched on failure.
#[instrument(
    skip_all,
    fields(customer_id = %request.customer_id, method = %request.payment_method, items = cart.item_count())
)]
pub async fn place_order(
    backend: &BackendClient,
    orchestrator: &CheckoutOrchestrator,
    cart: &mut Cart,
    request: MarketplaceOrderRequest,
    currency: Currency,
) -> Result<PlacedOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::Validation("cart is empty".to_string()));
    }
    let shipping_address = request.address.to_string();

    let placed = if request.payment_method.is_prepaid() {
        let amount = cart
            .total_amount(currency)
            .map_err(|e| CheckoutError::Validation(e.to_string()))?;
        let commit = MarketplaceCommit::new(
            backend.clone(),
            request.customer_id,
            cart.checkout_items(),
            request.payment_method,
            shipping_address,
        );

        match orchestrator
            .run(request.draft, amount, currency, &commit)
            .await?
        {
            CheckoutOutcome::Confirmed {
                session,
                receipt: CommitReceipt::Order(order),
                ..
            } => PlacedOrder {
                order,
                payment_id: session.payment_id().cloned(),
                redirect_to: ORDERS_REDIRECT,
            },
            CheckoutOutcome::Confirmed { .. } => {
                return Err(CheckoutError::BackendRejected(
                    "order confirmation missing".to_string(),
                ));
            }
            CheckoutOutcome::Failed { error, .. } => return Err(error),
        }
    } else {
        let items = cart.checkout_items();
        let order = backend
            .marketplace_checkout(&MarketplaceCheckoutRequest {
                customer_id: request.customer_id,
                items: &items,
                payment_method: request.payment_method,
                shipping_address: &shipping_address,
                payment_id: None,
            })
            .await?;
        PlacedOrder {
            order,
            payment_id: None,
            redirect_to: ORDERS_REDIRECT,
        }
    };

    info!(order_id = %placed.order.order_id, total = %placed.order.total_amount, "Marketplace order placed");
    cart.clear();
    Ok(placed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{BackendConfig, CheckoutConfig};
    use crate::gateway::ChannelGateway;

    #[tokio::test]
    async fn test_empty_cart_is_rejected_before_any_call() {
        let backend =
            BackendClient::new(&BackendConfig::new("http://127.0.0.1:9").unwrap()).unwrap();
        let (gateway, _prompts) = ChannelGateway::new(1);
        let orchestrator = CheckoutOrchestrator::new(
            Arc::new(backend.clone()),
            Arc::new(gateway),
            &CheckoutConfig::default(),
        );
        let request = MarketplaceOrderRequest {
            customer_id: CustomerId::new(1),
            draft: UserDraft::parse("Jane Doe", "jane@example.com", "+919876543210").unwrap(),
            address: ShippingAddress::parse("Jane Doe", "9876543210", "560001", "12 MG Road")
                .unwrap(),
            payment_method: PaymentMethod::Cod,
        };

        let err = place_order(
            &backend,
            &orchestrator,
            &mut Cart::default(),
            request,
            Currency::INR,
        )
        .await
        .unwrap_err();
        assert_eq!(err.user_message(), "cart is empty");
    }
}
