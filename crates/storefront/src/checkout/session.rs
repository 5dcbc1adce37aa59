//! One checkout attempt.
//!
//! A [`CheckoutSession`] moves forward through [`CheckoutStatus`] exactly
//! once. Every transition checks the current state, so a repeated or
//! out-of-order step is an error instead of a silent overwrite. Sessions are
//! never reset; a retry starts a new one.

use chrono::{DateTime, Utc};
use lumina_core::{CheckoutStatus, OrderId, PaymentId, UserDraft};
use uuid::Uuid;

use super::error::CheckoutError;
use crate::backend::PaymentOrder;
use crate::gateway::PaymentConfirmation;

/// Why a session failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    /// Customer-facing message.
    pub message: String,
    /// Underlying cause, for logs and support.
    pub cause: String,
}

/// State of one checkout attempt.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    status: CheckoutStatus,
    draft: UserDraft,
    order: Option<PaymentOrder>,
    payment: Option<PaymentConfirmation>,
    failure: Option<SessionFailure>,
}

impl CheckoutSession {
    /// Start an idle session for validated form input.
    #[must_use]
    pub fn new(draft: UserDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            status: CheckoutStatus::Idle,
            draft,
            order: None,
            payment: None,
            failure: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub const fn status(&self) -> CheckoutStatus {
        self.status
    }

    #[must_use]
    pub const fn draft(&self) -> &UserDraft {
        &self.draft
    }

    /// The reserved payment order, once created.
    #[must_use]
    pub const fn order(&self) -> Option<&PaymentOrder> {
        self.order.as_ref()
    }

    #[must_use]
    pub fn order_id(&self) -> Option<&OrderId> {
        self.order.as_ref().map(|order| &order.id)
    }

    /// The gateway's confirmation, once the payment succeeded.
    #[must_use]
    pub const fn payment(&self) -> Option<&PaymentConfirmation> {
        self.payment.as_ref()
    }

    #[must_use]
    pub fn payment_id(&self) -> Option<&PaymentId> {
        self.payment.as_ref().map(|payment| &payment.payment_id)
    }

    /// Customer-facing error, present only when the session failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.message.as_str())
    }

    #[must_use]
    pub const fn failure(&self) -> Option<&SessionFailure> {
        self.failure.as_ref()
    }

    fn advance(&mut self, from: CheckoutStatus, to: CheckoutStatus) -> Result<(), CheckoutError> {
        if self.status != from {
            return Err(CheckoutError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// `idle -> creating_order`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::IllegalTransition`] unless the session is idle.
    pub fn submit(&mut self) -> Result<(), CheckoutError> {
        self.advance(CheckoutStatus::Idle, CheckoutStatus::CreatingOrder)
    }

    /// `creating_order -> awaiting_payment`, recording the order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::IllegalTransition`] unless an order is being
    /// created.
    pub fn order_created(&mut self, order: PaymentOrder) -> Result<(), CheckoutError> {
        self.advance(CheckoutStatus::CreatingOrder, CheckoutStatus::AwaitingPayment)?;
        self.order = Some(order);
        Ok(())
    }

    /// `awaiting_payment -> committing`, recording the confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::IllegalTransition`] unless a payment is
    /// awaited.
    pub fn payment_confirmed(
        &mut self,
        confirmation: PaymentConfirmation,
    ) -> Result<(), CheckoutError> {
        self.advance(CheckoutStatus::AwaitingPayment, CheckoutStatus::Committing)?;
        self.payment = Some(confirmation);
        Ok(())
    }

    /// `committing -> success`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::IllegalTransition`] unless committing.
    pub fn committed(&mut self) -> Result<(), CheckoutError> {
        self.advance(CheckoutStatus::Committing, CheckoutStatus::Success)
    }

    /// Move to `failed` from any in-flight state.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::IllegalTransition`] if the session is idle or
    /// already finished.
    pub fn fail(&mut self, error: &CheckoutError) -> Result<(), CheckoutError> {
        if !self.status.is_in_flight() {
            return Err(CheckoutError::IllegalTransition {
                from: self.status,
                to: CheckoutStatus::Failed,
            });
        }
        self.status = CheckoutStatus::Failed;
        self.failure = Some(SessionFailure {
            message: error.user_message(),
            cause: error.to_string(),
        });
        Ok(())
    }
}
