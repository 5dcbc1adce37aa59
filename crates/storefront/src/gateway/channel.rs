//! Gateway bridged to a UI layer over a channel.
//!
//! [`ChannelGateway::open`] hands a [`PaymentPrompt`] to whatever drives the
//! hosted payment UI (a terminal prompt, a webview, a test) and waits for it
//! to be resolved. Each prompt resolves at most once: the resolving methods
//! consume it, and dropping it unresolved counts as a cancellation. A
//! success that arrives after the checkout stopped waiting is reported as an
//! unrecorded payment.

use async_trait::async_trait;
use lumina_core::PaymentId;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, warn};

use crate::error::report_unrecorded_payment;

use super::{GatewayConfig, GatewayOutcome, PaymentConfirmation, PaymentGateway};

/// A payment UI waiting to be resolved.
#[derive(Debug)]
pub struct PaymentPrompt {
    config: GatewayConfig,
    reply: oneshot::Sender<GatewayOutcome>,
}

impl PaymentPrompt {
    /// What the UI should display.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Report a successful payment against the prompted order.
    ///
    /// Returns `false` if the checkout had already stopped waiting. The
    /// payment is then reported as unrecorded and the UI should send the
    /// customer to support with the payment id.
    #[must_use = "a late payment needs a support message"]
    pub fn succeed(self, payment_id: PaymentId, signature: Option<String>) -> bool {
        let order_id = self.config.order_id.clone();
        self.resolve(GatewayOutcome::Success(PaymentConfirmation {
            payment_id,
            order_id,
            signature,
        }))
    }

    /// Report a declined or failed payment.
    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.resolve(GatewayOutcome::Failed(reason.into()));
    }

    /// Report that the user closed the payment UI.
    pub fn cancel(self) {
        let _ = self.resolve(GatewayOutcome::cancelled());
    }

    /// Report an arbitrary outcome. Returns `false` if nothing was waiting.
    #[must_use = "a late payment needs a support message"]
    pub fn resolve(self, outcome: GatewayOutcome) -> bool {
        match self.reply.send(outcome) {
            Ok(()) => true,
            Err(GatewayOutcome::Success(confirmation)) => {
                report_unrecorded_payment(
                    &confirmation.order_id,
                    &confirmation.payment_id,
                    "gateway confirmed payment after checkout stopped waiting",
                );
                false
            }
            Err(GatewayOutcome::Failed(reason)) => {
                debug!(
                    order_id = %self.config.order_id,
                    reason = %reason,
                    "Payment prompt resolved after checkout gave up"
                );
                false
            }
        }
    }
}

/// [`PaymentGateway`] that forwards each session to a prompt receiver.
#[derive(Debug, Clone)]
pub struct ChannelGateway {
    prompts: mpsc::Sender<PaymentPrompt>,
}

impl ChannelGateway {
    /// Create a gateway and the receiver the UI layer reads prompts from.
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PaymentPrompt>) {
        let (prompts, receiver) = mpsc::channel(buffer.max(1));
        (Self { prompts }, receiver)
    }
}

#[async_trait]
impl PaymentGateway for ChannelGateway {
    #[instrument(skip(self, config), fields(order_id = %config.order_id, amount = %config.amount))]
    async fn open(&self, config: GatewayConfig) -> GatewayOutcome {
        let (reply, outcome) = oneshot::channel();

        if self
            .prompts
            .send(PaymentPrompt { config, reply })
            .await
            .is_err()
        {
            warn!("Payment UI is not listening");
            return GatewayOutcome::Failed("payment UI unavailable".to_string());
        }

        outcome.await.unwrap_or_else(|_| GatewayOutcome::cancelled())
    }
}
