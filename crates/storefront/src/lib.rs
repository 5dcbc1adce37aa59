//! Lumina storefront client library.
//!
//! Everything the storefront does over the network lives here, so the CLI
//! and tests share one implementation:
//! - [`backend`] - REST client for the Lumina backend
//! - [`gateway`] - hosted payment UI abstraction and signature checks
//! - [`checkout`] - checkout state machine, orchestrator, cart
//! - [`session`] / [`auth`] - local session and credential verification
//! - [`chat`] - support chat conversation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod backend;
pub mod chat;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;

pub use config::StorefrontConfig;
pub use error::{Result, StorefrontError};
