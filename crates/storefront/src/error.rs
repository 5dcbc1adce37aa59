//! Unified error handling with Sentry integration.
//!
//! [`StorefrontError`] wraps every module error so front ends can return
//! one type. Unexpected failures are captured to Sentry through
//! [`StorefrontError::capture`]; payment-related failures are always
//! reported by the checkout itself through [`report_post_payment_failure`]
//! and [`report_unrecorded_payment`].

use lumina_core::{OrderId, PaymentId};
use thiserror::Error;

use crate::auth::AuthError;
use crate::backend::ApiError;
use crate::checkout::{AddressError, CheckoutError, CheckoutSession};
use crate::config::ConfigError;
use crate::session::StoreError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Checkout attempt failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Authentication or authorization failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Local state could not be read or written.
    #[error("Local state error: {0}")]
    Store(#[from] StoreError),

    /// Shipping address rejected.
    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),

    /// Other invalid user input.
    #[error("Invalid input: {0}")]
    Input(String),
}

impl StorefrontError {
    /// Message to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Checkout(err) => err.user_message(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            Self::Auth(AuthError::NotLoggedIn) => "Please log in first".to_string(),
            Self::Api(ApiError::Rejected { message, .. }) => message.clone(),
            Self::Api(ApiError::Network(_)) => "Could not reach the server".to_string(),
            _ => self.to_string(),
        }
    }

    /// Capture unexpected failures to Sentry. User mistakes are not sent.
    pub fn capture(&self) -> Option<sentry::types::Uuid> {
        let unexpected = matches!(
            self,
            Self::Api(ApiError::MalformedResponse(_) | ApiError::Setup(_))
                | Self::Store(_)
                | Self::Auth(AuthError::PasswordHash | AuthError::Store(_))
        );
        if !unexpected {
            return None;
        }

        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Storefront error"
        );
        Some(event_id)
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Report a payment that succeeded but could not be recorded.
///
/// Sent at error level with the ids support needs to reconcile by hand.
pub fn report_post_payment_failure(
    session: &CheckoutSession,
    cause: &ApiError,
) -> sentry::types::Uuid {
    let order_id = session.order_id().map(ToString::to_string).unwrap_or_default();
    let payment_id = session
        .payment_id()
        .map(ToString::to_string)
        .unwrap_or_default();

    let event_id = sentry::with_scope(
        |scope| {
            scope.set_tag("checkout_id", session.id());
            scope.set_tag("order_id", &order_id);
            scope.set_tag("payment_id", &payment_id);
            scope.set_extra("cause", cause.to_string().into());
            scope.set_extra("customer_email", session.draft().email.as_str().into());
        },
        || {
            sentry::capture_message(
                "Payment captured but commit failed",
                sentry::Level::Error,
            )
        },
    );

    tracing::error!(
        checkout_id = %session.id(),
        order_id = %order_id,
        payment_id = %payment_id,
        error = %cause,
        sentry_event_id = %event_id,
        "Payment succeeded but commit failed"
    );
    event_id
}

/// Report a captured payment that no checkout recorded.
///
/// Covers a gateway success that arrives after the checkout stopped waiting
/// and a checkout dropped while its commit was in flight.
pub fn report_unrecorded_payment(
    order_id: &OrderId,
    payment_id: &PaymentId,
    reason: &str,
) -> sentry::types::Uuid {
    let event_id = sentry::with_scope(
        |scope| {
            scope.set_tag("order_id", order_id);
            scope.set_tag("payment_id", payment_id);
            scope.set_extra("cause", reason.into());
        },
        || sentry::capture_message("Payment captured but not recorded", sentry::Level::Error),
    );

    tracing::error!(
        order_id = %order_id,
        payment_id = %payment_id,
        reason,
        sentry_event_id = %event_id,
        "Payment captured but not recorded"
    );
    event_id
}

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Payment order created", Some(&[("order_id", "order_abc")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = StorefrontError::from(CheckoutError::GatewayFailure("declined".to_string()));
        assert_eq!(err.user_message(), "payment failed: declined");

        let err = StorefrontError::from(ApiError::Rejected {
            status: 400,
            message: "Product 2 is out of stock or does not exist.".to_string(),
        });
        assert_eq!(
            err.user_message(),
            "Product 2 is out of stock or does not exist."
        );

        let err = StorefrontError::from(AuthError::NotLoggedIn);
        assert_eq!(err.user_message(), "Please log in first");
    }

    #[test]
    fn test_user_mistakes_are_not_captured() {
        assert!(StorefrontError::from(AuthError::InvalidCredentials)
            .capture()
            .is_none());
        assert!(StorefrontError::Input("bad quantity".to_string())
            .capture()
            .is_none());
    }

    #[test]
    fn test_unexpected_errors_are_captured() {
        let err = StorefrontError::from(ApiError::MalformedResponse("no order".to_string()));
        assert!(err.capture().is_some());
    }
}
