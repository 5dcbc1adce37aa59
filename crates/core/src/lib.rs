//! Lumina Core - Shared domain types.
//!
//! This crate provides the types used across all Lumina components:
//! - `storefront` - Backend client, checkout orchestration, local session
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients. Values that reach the network layer have already been validated
//! here, so the checkout flow never sends a malformed amount, currency,
//! email or phone number to the backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, contact details and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
