//! Checkout orchestration: order, payment, commit, redirect.
//!
//! [`CheckoutOrchestrator::run`] drives one [`CheckoutSession`] through
//!
//! ```text
//! idle -> creating_order -> awaiting_payment -> committing -> success
//!              |                  |                 |
//!              +------------------+-----------------+--> failed
//! ```
//!
//! Guarantees:
//! - at most one attempt runs per orchestrator, so a double submit never
//!   creates a second order
//! - nothing is committed without a gateway confirmation for this attempt's
//!   order
//! - a commit failure after payment is reported to Sentry and surfaced with
//!   a contact-support message
//! - dropping the `run` future while the commit is in flight reports the
//!   payment as unrecorded

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lumina_core::{Amount, Currency, OrderId, PaymentId, UserDraft};
use tracing::{info, instrument, warn};

use super::error::{CheckoutError, PAYMENT_TIMEOUT_REASON};
use super::ports::{CommitReceipt, CommitService, OrderService};
use super::session::CheckoutSession;
use crate::backend::PaymentOrder;
use crate::config::{CheckoutConfig, MerchantDisplay};
use crate::error::{add_breadcrumb, report_post_payment_failure, report_unrecorded_payment};
use crate::gateway::{GatewayConfig, GatewayOutcome, PaymentConfirmation, PaymentGateway, Prefill};

/// How a checkout attempt ended.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// Payment recorded; the caller should navigate to `redirect_to`.
    Confirmed {
        session: CheckoutSession,
        receipt: CommitReceipt,
        redirect_to: String,
    },
    /// The attempt failed; `session.error_message()` is set.
    Failed {
        session: CheckoutSession,
        error: CheckoutError,
    },
}

impl CheckoutOutcome {
    #[must_use]
    pub const fn session(&self) -> &CheckoutSession {
        match self {
            Self::Confirmed { session, .. } | Self::Failed { session, .. } => session,
        }
    }

    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// Redirect signal, present only on success.
    #[must_use]
    pub fn redirect_to(&self) -> Option<&str> {
        match self {
            Self::Confirmed { redirect_to, .. } => Some(redirect_to),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&CheckoutError> {
        match self {
            Self::Confirmed { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Runs checkout attempts against an order service and a payment gateway.
///
/// Share it behind an `Arc`; concurrent calls to [`Self::run`] are rejected
/// while one attempt is in flight.
pub struct CheckoutOrchestrator {
    orders: Arc<dyn OrderService>,
    gateway: Arc<dyn PaymentGateway>,
    key_id: String,
    merchant: MerchantDisplay,
    payment_timeout: Duration,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when an attempt ends, including when the
/// `run` future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reports a confirmed payment as unrecorded if the attempt is dropped
/// before the commit settles.
struct PendingCommit {
    order_id: OrderId,
    payment_id: PaymentId,
    settled: bool,
}

impl PendingCommit {
    fn new(confirmation: &PaymentConfirmation) -> Self {
        Self {
            order_id: confirmation.order_id.clone(),
            payment_id: confirmation.payment_id.clone(),
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingCommit {
    fn drop(&mut self) {
        if !self.settled {
            report_unrecorded_payment(
                &self.order_id,
                &self.payment_id,
                "checkout dropped while recording the payment",
            );
        }
    }
}

impl CheckoutOrchestrator {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderService>,
        gateway: Arc<dyn PaymentGateway>,
        config: &CheckoutConfig,
    ) -> Self {
        Self {
            orders,
            gateway,
            key_id: config.gateway_key_id.clone(),
            merchant: config.merchant.clone(),
            payment_timeout: config.payment_timeout,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Returns `true` while an attempt is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    /// Run one checkout attempt for `amount` and record it with `commit`.
    ///
    /// Failures of the attempt itself come back as
    /// [`CheckoutOutcome::Failed`] with the finished session.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AlreadyInProgress`], without touching the
    /// network, if another attempt is running.
    #[instrument(
        skip_all,
        fields(checkout_id = tracing::field::Empty, amount = %amount, currency = %currency)
    )]
    pub async fn run(
        &self,
        draft: UserDraft,
        amount: Amount,
        currency: Currency,
        commit: &dyn CommitService,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let Some(_guard) = self.begin() else {
            warn!("Checkout submitted while another attempt is in flight");
            return Err(CheckoutError::AlreadyInProgress);
        };

        let mut session = CheckoutSession::new(draft);
        let checkout_id = session.id().to_string();
        tracing::Span::current().record("checkout_id", checkout_id.as_str());

        session.submit()?;
        add_breadcrumb(
            "checkout",
            "Checkout started",
            Some(&[("checkout_id", checkout_id.as_str())]),
        );

        let order = match self.orders.create_order(amount, currency, &checkout_id).await {
            Ok(order) => order,
            Err(err) => return Self::finish_failed(session, err.into()),
        };
        session.order_created(order.clone())?;
        add_breadcrumb(
            "checkout",
            "Payment order created",
            Some(&[("order_id", order.id.as_str())]),
        );

        let config = self.gateway_config(&session, &order);
        let outcome = tokio::time::timeout(self.payment_timeout, self.gateway.open(config))
            .await
            .unwrap_or_else(|_| {
                warn!(timeout_secs = self.payment_timeout.as_secs(), "Payment session timed out");
                GatewayOutcome::Failed(PAYMENT_TIMEOUT_REASON.to_string())
            });

        let confirmation = match outcome {
            GatewayOutcome::Success(confirmation) => confirmation,
            GatewayOutcome::Failed(reason) => {
                return Self::finish_failed(session, CheckoutError::GatewayFailure(reason));
            }
        };

        if confirmation.payment_id.is_blank() {
            return Self::finish_failed(
                session,
                CheckoutError::GatewayFailure("no payment id returned".to_string()),
            );
        }
        if confirmation.order_id != order.id {
            tracing::error!(
                expected_order = %order.id,
                paid_order = %confirmation.order_id,
                payment_id = %confirmation.payment_id,
                "Gateway confirmed a payment for a different order"
            );
            return Self::finish_failed(
                session,
                CheckoutError::GatewayFailure("payment does not match this order".to_string()),
            );
        }

        session.payment_confirmed(confirmation.clone())?;
        add_breadcrumb(
            "checkout",
            "Payment confirmed",
            Some(&[("payment_id", confirmation.payment_id.as_str())]),
        );

        let pending = PendingCommit::new(&confirmation);
        let committed = commit.commit(session.draft(), &confirmation).await;
        pending.settle();

        match committed {
            Ok(receipt) => {
                session.committed()?;
                info!(
                    order_id = %order.id,
                    payment_id = %confirmation.payment_id,
                    "Checkout confirmed"
                );
                Ok(CheckoutOutcome::Confirmed {
                    session,
                    receipt,
                    redirect_to: commit.redirect_to().to_string(),
                })
            }
            Err(source) => {
                report_post_payment_failure(&session, &source);
                Self::finish_failed(
                    session,
                    CheckoutError::PostPaymentCommitFailure {
                        payment_id: confirmation.payment_id,
                        source,
                    },
                )
            }
        }
    }

    fn gateway_config(&self, session: &CheckoutSession, order: &PaymentOrder) -> GatewayConfig {
        let draft = session.draft();
        GatewayConfig {
            key_id: self.key_id.clone(),
            amount: order.amount,
            currency: order.currency,
            order_id: order.id.clone(),
            merchant: self.merchant.clone(),
            prefill: Prefill {
                name: draft.name.to_string(),
                email: draft.email.clone(),
                contact: draft.phone.as_str().to_string(),
            },
        }
    }

    fn finish_failed(
        mut session: CheckoutSession,
        error: CheckoutError,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        session.fail(&error)?;
        if !error.is_post_payment() {
            warn!(error = %error, status = %session.status(), "Checkout failed");
        }
        Ok(CheckoutOutcome::Failed { session, error })
    }
}
