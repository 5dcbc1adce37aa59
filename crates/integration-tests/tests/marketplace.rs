//! Marketplace cart checkout: cash on delivery and prepaid.

use lumina_core::{CustomerId, PaymentMethod, ProductId, UserDraft};
use lumina_integration_tests::{MockBackend, Payer, checkout_config, orchestrator};
use lumina_storefront::backend::{BackendClient, Product};
use lumina_storefront::checkout::{
    Cart, CheckoutError, MarketplaceOrderRequest, ShippingAddress, place_order,
};
use rust_decimal::Decimal;

async fn product(client: &BackendClient, id: i64) -> Product {
    client
        .list_products()
        .await
        .expect("products")
        .iter()
        .find(|p| p.id == ProductId::new(id))
        .cloned()
        .expect("product in catalog")
}

fn request(method: PaymentMethod) -> MarketplaceOrderRequest {
    MarketplaceOrderRequest {
        customer_id: CustomerId::new(42),
        draft: UserDraft::parse("Jane Doe", "jane@example.com", "+919876543210")
            .expect("valid draft"),
        address: ShippingAddress::parse(
            "Jane Doe",
            "+91 98765 43210",
            "560001",
            "12 MG Road, Bengaluru",
        )
        .expect("valid address"),
        payment_method: method,
    }
}

#[tokio::test]
async fn test_cash_on_delivery_places_order_without_payment() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, payer) = orchestrator(&client, Payer::Pay("pay_1"), &checkout_config());

    let mut cart = Cart::default();
    cart.add(&product(&client, 1).await, 2);

    let placed = place_order(
        &client,
        &orchestrator,
        &mut cart,
        request(PaymentMethod::Cod),
        checkout_config().currency,
    )
    .await
    .expect("order placed");
    drop(orchestrator);

    assert_eq!(placed.order.order_id.as_i64(), 1001);
    assert_eq!(placed.order.total_amount, Decimal::new(499, 0));
    assert_eq!(placed.payment_id, None);
    assert_eq!(placed.redirect_to, "/orders");
    assert!(cart.is_empty());

    assert_eq!(mock.create_order_calls(), 0);
    assert!(payer.await.expect("payer task").is_empty());
    assert_eq!(mock.stock(1), Some(8));

    let sent = &mock.checkout_requests()[0];
    assert_eq!(sent["customer_id"], 42);
    assert_eq!(sent["payment_method"], "cod");
    assert_eq!(sent["shipping_address"], "Jane Doe, 12 MG Road, Bengaluru, 560001");
    assert_eq!(sent["items"][0]["product_id"], 1);
    assert_eq!(sent["items"][0]["quantity"], 2);
    assert!(sent.get("payment_id").is_none());
}

#[tokio::test]
async fn test_prepaid_order_is_placed_after_payment() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, payer) = orchestrator(&client, Payer::Pay("pay_mp1"), &checkout_config());

    let mut cart = Cart::default();
    cart.add(&product(&client, 1).await, 2);
    cart.add(&product(&client, 2).await, 1);

    let placed = place_order(
        &client,
        &orchestrator,
        &mut cart,
        request(PaymentMethod::Upi),
        checkout_config().currency,
    )
    .await
    .expect("order placed");
    drop(orchestrator);

    assert_eq!(placed.payment_id.as_ref().map(|p| p.as_str()), Some("pay_mp1"));
    assert_eq!(placed.order.total_amount, Decimal::new(1398, 0));
    assert!(cart.is_empty());

    // 499.00 + 899.00 in paise
    assert_eq!(mock.order_requests()[0]["amount"], 139_800);
    let opened = payer.await.expect("payer task");
    assert_eq!(opened.len(), 1);

    let sent = &mock.checkout_requests()[0];
    assert_eq!(sent["payment_method"], "upi");
    assert_eq!(sent["payment_id"], "pay_mp1");
    assert_eq!(mock.register_calls(), 0);
}

#[tokio::test]
async fn test_out_of_stock_keeps_the_cart() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, _payer) = orchestrator(&client, Payer::Pay("pay_1"), &checkout_config());

    let mut cart = Cart::default();
    cart.add(&product(&client, 2).await, 2);
    let before = cart.clone();

    let err = place_order(
        &client,
        &orchestrator,
        &mut cart,
        request(PaymentMethod::Cod),
        checkout_config().currency,
    )
    .await
    .expect_err("not enough stock");

    assert!(matches!(
        err,
        CheckoutError::BackendRejected(ref message)
            if message == "Product 2 is out of stock or does not exist."
    ));
    assert_eq!(cart, before);
    assert_eq!(mock.stock(2), Some(1));
}

#[tokio::test]
async fn test_stock_gone_after_payment_is_a_post_payment_failure() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, _payer) = orchestrator(&client, Payer::Pay("pay_late"), &checkout_config());

    let mut cart = Cart::default();
    cart.add(&product(&client, 1).await, 1);
    // Someone else bought the last units while the customer was paying
    mock.set_stock(1, 0);

    let err = place_order(
        &client,
        &orchestrator,
        &mut cart,
        request(PaymentMethod::Card),
        checkout_config().currency,
    )
    .await
    .expect_err("stock gone");

    assert!(err.is_post_payment());
    assert_eq!(
        err.user_message(),
        "payment succeeded but registration failed — contact support"
    );
    assert_eq!(cart.item_count(), 1);
}

#[tokio::test]
async fn test_declined_prepaid_order_is_not_placed() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, _payer) =
        orchestrator(&client, Payer::Decline("insufficient funds"), &checkout_config());

    let mut cart = Cart::default();
    cart.add(&product(&client, 1).await, 1);

    let err = place_order(
        &client,
        &orchestrator,
        &mut cart,
        request(PaymentMethod::Upi),
        checkout_config().currency,
    )
    .await
    .expect_err("declined");

    assert!(matches!(err, CheckoutError::GatewayFailure(ref reason) if reason == "insufficient funds"));
    assert_eq!(mock.checkout_calls(), 0);
    assert!(!cart.is_empty());
}
