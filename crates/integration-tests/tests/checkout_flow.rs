//! Subscription checkout end to end: order, payment, register, redirect.
//!
//! Each test runs the real backend client against a [`MockBackend`] and
//! answers the payment UI with a scripted [`Payer`].

use std::sync::Arc;
use std::time::Duration;

use lumina_core::{Amount, CheckoutStatus, Currency, PaymentId, UserDraft};
use lumina_integration_tests::{
    MockBackend, Payer, Route, checkout_config, gateway_signature, orchestrator,
};
use lumina_storefront::checkout::{
    CheckoutError, CheckoutOrchestrator, CheckoutOutcome, POST_PAYMENT_COMMIT_FAILED,
    SubscriptionCommit,
};
use lumina_storefront::gateway::ChannelGateway;

fn draft(email: &str) -> UserDraft {
    UserDraft::parse("Jane Doe", email, "+919876543210").expect("valid draft")
}

fn plan() -> Amount {
    Amount::new(49_900).expect("non-zero amount")
}

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_paid_subscription_is_registered_and_redirects() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, payer) = orchestrator(&client, Payer::Pay("pay_123"), &checkout_config());

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");
    drop(orchestrator);
    let opened = payer.await.expect("payer task");

    assert!(outcome.is_confirmed());
    assert_eq!(outcome.redirect_to(), Some("/dashboard"));
    let session = outcome.session();
    assert_eq!(session.status(), CheckoutStatus::Success);
    assert_eq!(session.payment_id().map(|p| p.as_str()), Some("pay_123"));

    // One order, created for this attempt
    assert_eq!(mock.create_order_calls(), 1);
    let order_request = &mock.order_requests()[0];
    assert_eq!(order_request["amount"], 49_900);
    assert_eq!(order_request["currency"], "INR");
    assert_eq!(order_request["receipt"], session.id().to_string());

    // The payment UI saw that order and the customer's details
    assert_eq!(opened.len(), 1);
    let config = &opened[0];
    assert_eq!(config.key_id, "rzp_test_mock");
    assert_eq!(config.order_id.as_str(), "order_mock1");
    assert_eq!(config.amount, plan());
    assert_eq!(config.prefill.contact, "+919876543210");

    // Registration carried the payment and its binding
    assert_eq!(mock.register_calls(), 1);
    let register = &mock.register_requests()[0];
    assert_eq!(register["email"], "jane@example.com");
    assert_eq!(register["payment_id"], "pay_123");
    assert_eq!(register["order_id"], "order_mock1");
    assert!(register["signature"].is_string());
    assert_eq!(mock.users().len(), 1);
}

#[tokio::test]
async fn test_one_rupee_order_registers_gateway_ids() {
    let mock = MockBackend::start().await;
    mock.respond_with(
        Route::CreateOrder,
        200,
        r#"{"status":"success","order":{"id":"order_abc","amount":100,"currency":"INR"}}"#,
    );
    let client = mock.client();
    let (orchestrator, payer) = orchestrator(&client, Payer::Pay("pay_123"), &checkout_config());

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            Amount::new(100).expect("non-zero amount"),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");
    drop(orchestrator);
    let opened = payer.await.expect("payer task");

    assert!(outcome.is_confirmed());
    assert_eq!(outcome.redirect_to(), Some("/dashboard"));
    assert_eq!(opened[0].order_id.as_str(), "order_abc");
    assert_eq!(opened[0].amount.minor_units(), 100);

    assert_eq!(mock.create_order_calls(), 1);
    assert_eq!(mock.order_requests()[0]["amount"], 100);
    assert_eq!(mock.register_calls(), 1);
    let register = &mock.register_requests()[0];
    assert_eq!(register["order_id"], "order_abc");
    assert_eq!(register["payment_id"], "pay_123");
    assert_eq!(
        register["signature"],
        gateway_signature("order_abc", "pay_123").as_str()
    );
}

#[tokio::test]
async fn test_unsigned_payment_is_still_registered() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, _payer) =
        orchestrator(&client, Payer::PayUnsigned("pay_456"), &checkout_config());

    let outcome = orchestrator
        .run(
            draft("raj@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");

    assert!(outcome.is_confirmed());
    assert!(mock.register_requests()[0].get("signature").is_none());
}

// ============================================================================
// Failures before payment
// ============================================================================

#[tokio::test]
async fn test_order_failure_never_opens_payment() {
    let mock = MockBackend::start().await;
    mock.respond_with(
        Route::CreateOrder,
        500,
        r#"{"status":"error","message":"Razorpay Error: gateway down"}"#,
    );
    let client = mock.client();
    let (orchestrator, payer) = orchestrator(&client, Payer::Pay("pay_1"), &checkout_config());

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");
    drop(orchestrator);

    assert_eq!(outcome.session().status(), CheckoutStatus::Failed);
    assert_eq!(
        outcome.session().error_message(),
        Some("order creation failed")
    );
    assert!(matches!(
        outcome.error(),
        Some(CheckoutError::BackendRejected(message)) if message == "Razorpay Error: gateway down"
    ));
    assert!(payer.await.expect("payer task").is_empty());
    assert_eq!(mock.register_calls(), 0);
}

#[tokio::test]
async fn test_rate_limited_order_creation_fails_the_attempt() {
    let mock = MockBackend::start().await;
    mock.rate_limit(Route::CreateOrder, 30);
    let client = mock.client();
    let (orchestrator, _payer) = orchestrator(&client, Payer::Pay("pay_1"), &checkout_config());

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");

    assert!(matches!(
        outcome.error(),
        Some(CheckoutError::BackendRejected(message)) if message.contains("retry after 30s")
    ));
    assert_eq!(mock.create_order_calls(), 1);
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_failure() {
    let client = lumina_storefront::backend::BackendClient::new(
        &lumina_storefront::config::BackendConfig::new("http://127.0.0.1:9").expect("url"),
    )
    .expect("client");
    let (orchestrator, payer) = orchestrator(&client, Payer::Pay("pay_1"), &checkout_config());

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");
    drop(orchestrator);

    assert!(matches!(outcome.error(), Some(CheckoutError::Network(_))));
    assert_eq!(
        outcome.session().error_message(),
        Some("order creation failed")
    );
    assert!(payer.await.expect("payer task").is_empty());
}

// ============================================================================
// Payment failures
// ============================================================================

#[tokio::test]
async fn test_cancelled_payment_is_not_registered() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, _payer) = orchestrator(&client, Payer::Cancel, &checkout_config());

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");

    assert_eq!(
        outcome.session().error_message(),
        Some("payment failed: cancelled")
    );
    assert!(outcome.redirect_to().is_none());
    assert_eq!(mock.create_order_calls(), 1);
    assert_eq!(mock.register_calls(), 0);
}

#[tokio::test]
async fn test_declined_payment_keeps_gateway_reason() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, _payer) =
        orchestrator(&client, Payer::Decline("card declined"), &checkout_config());

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");

    assert_eq!(
        outcome.session().error_message(),
        Some("payment failed: card declined")
    );
    assert_eq!(mock.register_calls(), 0);
}

#[tokio::test]
async fn test_payment_for_another_order_is_not_registered() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, _payer) =
        orchestrator(&client, Payer::PayOtherOrder("pay_789"), &checkout_config());

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");

    assert_eq!(
        outcome.session().error_message(),
        Some("payment failed: payment does not match this order")
    );
    assert_eq!(mock.register_calls(), 0);
}

#[tokio::test]
async fn test_abandoned_payment_times_out() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let mut config = checkout_config();
    config.payment_timeout = Duration::from_millis(100);
    let (orchestrator, _payer) = orchestrator(&client, Payer::Walk, &config);

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");

    assert_eq!(
        outcome.session().error_message(),
        Some("payment failed: timeout")
    );
    assert!(!orchestrator.is_busy());
    assert_eq!(mock.register_calls(), 0);
}

#[tokio::test]
async fn test_payment_after_timeout_is_never_registered() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let mut config = checkout_config();
    config.payment_timeout = Duration::from_millis(50);
    let (gateway, mut prompts) = ChannelGateway::new(1);
    let orchestrator =
        CheckoutOrchestrator::new(Arc::new(client.clone()), Arc::new(gateway), &config);

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");
    assert_eq!(
        outcome.session().error_message(),
        Some("payment failed: timeout")
    );

    // The customer finishes paying after the checkout gave up
    let prompt = prompts.recv().await.expect("prompt was opened");
    let late = PaymentId::parse("pay_late").expect("payment id");
    assert!(!prompt.succeed(late, None));

    assert!(outcome.session().payment_id().is_none());
    assert_eq!(mock.register_calls(), 0);
    assert!(mock.users().is_empty());
}

// ============================================================================
// Failures after payment
// ============================================================================

#[tokio::test]
async fn test_duplicate_email_after_payment_asks_for_support() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let commit = SubscriptionCommit::new(client.clone());
    let (orchestrator, _payer) = orchestrator(&client, Payer::Pay("pay_999"), &checkout_config());

    let first = orchestrator
        .run(draft("jane@example.com"), plan(), Currency::INR, &commit)
        .await
        .expect("first attempt runs");
    assert!(first.is_confirmed());

    let second = orchestrator
        .run(draft("jane@example.com"), plan(), Currency::INR, &commit)
        .await
        .expect("second attempt runs");

    assert_eq!(second.session().status(), CheckoutStatus::Failed);
    assert_eq!(
        second.session().error_message(),
        Some(POST_PAYMENT_COMMIT_FAILED)
    );
    match second.error() {
        Some(CheckoutError::PostPaymentCommitFailure { payment_id, source }) => {
            assert_eq!(payment_id.as_str(), "pay_999");
            assert!(source.to_string().contains("Email already registered"));
        }
        other => panic!("expected post-payment failure, got {other:?}"),
    }
    // Nothing was retried
    assert_eq!(mock.create_order_calls(), 2);
    assert_eq!(mock.register_calls(), 2);
    assert_eq!(mock.users().len(), 1);
}

#[tokio::test]
async fn test_forged_signature_is_rejected_by_the_backend() {
    let mock = MockBackend::start().await;
    let client = mock.client();
    let (orchestrator, _payer) =
        orchestrator(&client, Payer::PayForged("pay_321"), &checkout_config());

    let outcome = orchestrator
        .run(
            draft("jane@example.com"),
            plan(),
            Currency::INR,
            &SubscriptionCommit::new(client.clone()),
        )
        .await
        .expect("attempt runs");

    assert!(outcome.error().is_some_and(CheckoutError::is_post_payment));
    assert!(mock.users().is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_double_submit_creates_one_order() {
    let mock = MockBackend::start().await;
    mock.stall(Route::CreateOrder, Duration::from_millis(200));
    let client = mock.client();
    let commit = SubscriptionCommit::new(client.clone());
    let (orchestrator, _payer) = orchestrator(&client, Payer::Pay("pay_1"), &checkout_config());

    let (first, second) = tokio::join!(
        orchestrator.run(draft("jane@example.com"), plan(), Currency::INR, &commit),
        orchestrator.run(draft("jane@example.com"), plan(), Currency::INR, &commit),
    );

    assert!(matches!(first, Ok(CheckoutOutcome::Failed { .. })));
    assert!(matches!(second, Err(CheckoutError::AlreadyInProgress)));
    assert_eq!(mock.create_order_calls(), 1);
    assert!(!orchestrator.is_busy());
}
