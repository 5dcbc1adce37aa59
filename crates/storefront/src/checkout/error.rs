//! Checkout error taxonomy.

use lumina_core::{CheckoutStatus, DraftError, PaymentId};
use thiserror::Error;

use crate::backend::ApiError;

/// Shown when order creation fails, whatever the cause.
pub const ORDER_CREATION_FAILED: &str = "order creation failed";

/// Shown when the payment went through but could not be recorded.
pub const POST_PAYMENT_COMMIT_FAILED: &str =
    "payment succeeded but registration failed — contact support";

/// Reason used when the payment UI does not resolve in time.
pub const PAYMENT_TIMEOUT_REASON: &str = "timeout";

/// Errors that end a checkout attempt.
///
/// None of them is retried: a new attempt needs a new session.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Input rejected before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backend could not be reached before payment.
    #[error("network error: {0}")]
    Network(String),

    /// The backend refused the request before payment.
    #[error("backend rejected request: {0}")]
    BackendRejected(String),

    /// The payment UI reported failure, cancellation, or timed out.
    #[error("payment failed: {0}")]
    GatewayFailure(String),

    /// The customer was charged but the commit failed.
    #[error("commit failed after payment {payment_id}: {source}")]
    PostPaymentCommitFailure {
        payment_id: PaymentId,
        #[source]
        source: ApiError,
    },

    /// Another attempt is still running on this orchestrator.
    #[error("a checkout is already in progress")]
    AlreadyInProgress,

    /// A transition the state machine does not allow.
    #[error("illegal checkout transition from {from} to {to}")]
    IllegalTransition {
        from: CheckoutStatus,
        to: CheckoutStatus,
    },
}

impl CheckoutError {
    /// Message to show the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Network(_) | Self::BackendRejected(_) => ORDER_CREATION_FAILED.to_string(),
            Self::GatewayFailure(reason) => format!("payment failed: {reason}"),
            Self::PostPaymentCommitFailure { .. } => POST_PAYMENT_COMMIT_FAILED.to_string(),
            Self::AlreadyInProgress => "a checkout is already in progress".to_string(),
            Self::IllegalTransition { .. } => "something went wrong, please try again".to_string(),
        }
    }

    /// Returns `true` if money may have moved.
    #[must_use]
    pub const fn is_post_payment(&self) -> bool {
        matches!(self, Self::PostPaymentCommitFailure { .. })
    }
}

impl From<ApiError> for CheckoutError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(message) | ApiError::Setup(message) => Self::Network(message),
            ApiError::Rejected { message, .. } => Self::BackendRejected(message),
            ApiError::MalformedResponse(message) => {
                Self::BackendRejected(format!("malformed response: {message}"))
            }
        }
    }
}

impl From<DraftError> for CheckoutError {
    fn from(err: DraftError) -> Self {
        Self::Validation(err.to_string())
    }
}
