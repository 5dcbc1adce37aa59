//! Subscription checkout.

use lumina_core::UserDraft;
use lumina_storefront::StorefrontError;
use lumina_storefront::checkout::{CheckoutError, CheckoutOutcome, SubscriptionCommit};

use super::{Context, PaymentAnswer};

/// Pay for the plan and register the subscriber.
///
/// # Errors
///
/// Returns the error that ended the checkout attempt.
#[allow(clippy::print_stdout)]
pub async fn run(
    ctx: &Context,
    name: &str,
    email: &str,
    phone: &str,
    answer: Option<PaymentAnswer>,
) -> Result<(), StorefrontError> {
    let draft = UserDraft::parse(name, email, phone).map_err(CheckoutError::from)?;
    let checkout = &ctx.config.checkout;

    let (orchestrator, ui) = ctx.orchestrator(answer);
    let commit = SubscriptionCommit::new(ctx.backend.clone());
    let outcome = orchestrator
        .run(draft, checkout.plan_amount, checkout.currency, &commit)
        .await;
    // Closes the prompt channel so the UI task finishes.
    drop(orchestrator);
    ui.abort();

    match outcome? {
        CheckoutOutcome::Confirmed {
            session,
            redirect_to,
            ..
        } => {
            tracing::info!(checkout_id = %session.id(), "Subscription registered");
            println!("Subscription active for {}.", session.draft().email);
            if let Some(payment_id) = session.payment_id() {
                println!("Payment: {payment_id}");
            }
            println!("Next: {redirect_to}");
            Ok(())
        }
        CheckoutOutcome::Failed { error, .. } => Err(error.into()),
    }
}
