//! Shopping cart and shipping address.

use lumina_core::{Amount, AmountError, Currency, Price, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{CheckoutItem, Product};

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price in the store currency's standard unit.
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Cart contents, in the order products were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Add `quantity` units of `product`, merging with an existing line.
    ///
    /// A zero quantity is ignored.
    pub fn add(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(line) = self.line_mut(product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
            return;
        }
        self.lines.push(CartLine {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
        });
    }

    /// Set the quantity of a line. Returns `false` when nothing changed.
    ///
    /// Quantities below 1 are ignored; use [`Self::remove`] to drop a line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        if quantity < 1 {
            return false;
        }
        match self.line_mut(product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if the product was not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self, currency: Currency) -> Price {
        Price::new(self.lines.iter().map(CartLine::line_total).sum(), currency)
    }

    /// Subtotal as a chargeable amount.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::NotPositive`] for an empty or free cart.
    pub fn total_amount(&self, currency: Currency) -> Result<Amount, AmountError> {
        self.subtotal(currency).to_amount()
    }

    /// Lines in the shape the checkout endpoint expects.
    #[must_use]
    pub fn checkout_items(&self) -> Vec<CheckoutItem> {
        self.lines
            .iter()
            .map(|line| CheckoutItem {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect()
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

/// Errors for [`ShippingAddress::parse`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("recipient name cannot be empty")]
    EmptyName,
    #[error("address cannot be empty")]
    EmptyDetail,
    #[error("pincode must be exactly 6 digits")]
    InvalidPincode,
    #[error("phone must contain at least {min} digits")]
    InvalidPhone { min: usize },
}

/// A validated delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    name: String,
    phone: String,
    pincode: String,
    detail: String,
}

impl ShippingAddress {
    /// Minimum digits in a contact phone.
    pub const MIN_PHONE_DIGITS: usize = 10;

    /// Validate raw address fields.
    ///
    /// # Errors
    ///
    /// Returns the [`AddressError`] for the first invalid field.
    pub fn parse(
        name: &str,
        phone: &str,
        pincode: &str,
        detail: &str,
    ) -> Result<Self, AddressError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AddressError::EmptyName);
        }

        let phone = phone.trim();
        let phone_ok = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-'))
            && phone.chars().filter(char::is_ascii_digit).count() >= Self::MIN_PHONE_DIGITS;
        if !phone_ok {
            return Err(AddressError::InvalidPhone {
                min: Self::MIN_PHONE_DIGITS,
            });
        }

        let pincode = pincode.trim();
        if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
            return Err(AddressError::InvalidPincode);
        }

        let detail = detail.trim();
        if detail.is_empty() {
            return Err(AddressError::EmptyDetail);
        }

        Ok(Self {
            name: name.to_owned(),
            phone: phone.to_owned(),
            pincode: pincode.to_owned(),
            detail: detail.to_owned(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    #[must_use]
    pub fn pincode(&self) -> &str {
        &self.pincode
    }
}

impl std::fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.name, self.detail, self.pincode)
    }
}
