//! Core types for Lumina.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod draft;
pub mod email;
pub mod id;
pub mod phone;
pub mod price;
pub mod status;

pub use draft::{DraftError, PersonName, UserDraft};
pub use email::{Email, EmailError};
pub use id::*;
pub use phone::{Phone, PhoneError};
pub use price::{Amount, AmountError, Currency, CurrencyError, Price};
pub use status::*;
