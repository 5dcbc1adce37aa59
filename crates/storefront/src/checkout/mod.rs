//! Checkout: session state machine, orchestration, and commit targets.
//!
//! The same [`CheckoutOrchestrator`] drives both the subscription flow
//! ([`SubscriptionCommit`]) and prepaid marketplace orders
//! ([`MarketplaceCommit`] via [`place_order`]).

mod cart;
mod error;
mod marketplace;
mod orchestrator;
mod ports;
mod session;

pub use cart::{AddressError, Cart, CartLine, ShippingAddress};
pub use error::{
    CheckoutError, ORDER_CREATION_FAILED, PAYMENT_TIMEOUT_REASON, POST_PAYMENT_COMMIT_FAILED,
};
pub use marketplace::{MarketplaceOrderRequest, PlacedOrder, place_order};
pub use orchestrator::{CheckoutOrchestrator, CheckoutOutcome};
pub use ports::{
    CommitReceipt, CommitService, MarketplaceCommit, ORDERS_REDIRECT, OrderService,
    SUBSCRIPTION_REDIRECT, SubscriptionCommit,
};
pub use session::{CheckoutSession, SessionFailure};
