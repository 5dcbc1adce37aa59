//! Status enums for checkout, users, payments and chat.

use serde::{Deserialize, Serialize};

/// Progress of a single checkout attempt.
///
/// The declaration order is the order a successful attempt moves through;
/// [`CheckoutStatus::Failed`] can be reached from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Form submitted to nobody yet.
    #[default]
    Idle,
    /// Waiting for the backend to reserve a payment order.
    CreatingOrder,
    /// The payment gateway is open.
    AwaitingPayment,
    /// Payment confirmed, recording it with the backend.
    Committing,
    /// Payment recorded.
    Success,
    /// The attempt ended with an error.
    Failed,
}

impl CheckoutStatus {
    /// Returns `true` for `success` and `failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Returns `true` while network work is outstanding.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::CreatingOrder | Self::AwaitingPayment | Self::Committing
        )
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::CreatingOrder => "creating_order",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Committing => "committing",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Role attached to a logged-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Storefront customer.
    #[default]
    User,
    /// Marketplace seller.
    Vendor,
    /// Access to the admin console.
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Vendor => write!(f, "vendor"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "vendor" => Ok(Self::Vendor),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Marketplace payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// UPI collect or QR.
    #[default]
    Upi,
    /// Credit or debit card.
    Card,
    /// Cash on delivery.
    Cod,
}

impl PaymentMethod {
    /// Returns `true` when the order must be paid through the gateway first.
    #[must_use]
    pub const fn is_prepaid(self) -> bool {
        !matches!(self, Self::Cod)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upi => write!(f, "upi"),
            Self::Card => write!(f, "card"),
            Self::Cod => write!(f, "cod"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upi" => Ok(Self::Upi),
            "card" => Ok(Self::Card),
            "cod" => Ok(Self::Cod),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}
