//! Money types.
//!
//! Two representations are used:
//! - [`Amount`] + [`Currency`] - what the payment flow sends: a positive
//!   integer in the currency's smallest unit (paise, cents) and an ISO 4217
//!   code. Order creation and the payment gateway only ever see these.
//! - [`Price`] - catalog prices as decimals in the standard unit (rupees,
//!   dollars), converted with [`Price::to_amount`] at checkout time.

use core::fmt;
use core::num::NonZeroU64;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors for [`Amount`] construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// Zero amounts cannot be charged.
    #[error("amount must be a positive integer in the smallest currency unit")]
    NotPositive,
    /// A decimal price could not be represented in minor units.
    #[error("amount {0} cannot be represented in minor units")]
    OutOfRange(String),
}

/// Errors for [`Currency`] parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// Not a three-letter alphabetic code.
    #[error("currency must be a 3-letter ISO 4217 code, got {0:?}")]
    InvalidCode(String),
}

/// A positive amount in the smallest currency unit.
///
/// ```
/// use lumina_core::Amount;
///
/// assert_eq!(Amount::new(100).unwrap().minor_units(), 100);
/// assert!(Amount::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    /// Create an amount from minor units.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::NotPositive`] for zero.
    pub const fn new(minor_units: u64) -> Result<Self, AmountError> {
        if minor_units == 0 {
            return Err(AmountError::NotPositive);
        }
        Ok(Self(minor_units))
    }

    /// Create an amount from a value already known to be non-zero.
    #[must_use]
    pub const fn from_nonzero(minor_units: NonZeroU64) -> Self {
        Self(minor_units.get())
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Amount {
    type Error = AmountError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ISO 4217 currency code, stored upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    /// Indian rupee, the storefront's default currency.
    pub const INR: Self = Self(*b"INR");
    /// US dollar.
    pub const USD: Self = Self(*b"USD");

    /// Parse a currency code, accepting lower-case input.
    ///
    /// # Errors
    ///
    /// Returns [`CurrencyError::InvalidCode`] unless the input is exactly
    /// three ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CurrencyError> {
        let trimmed = s.trim();
        match trimmed.as_bytes() {
            [a, b, c] if [a, b, c].iter().all(|ch| ch.is_ascii_alphabetic()) => Ok(Self([
                a.to_ascii_uppercase(),
                b.to_ascii_uppercase(),
                c.to_ascii_uppercase(),
            ])),
            _ => Err(CurrencyError::InvalidCode(s.to_owned())),
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn code(&self) -> &str {
        // Only ASCII letters are ever stored.
        core::str::from_utf8(&self.0).unwrap_or("XXX")
    }

    /// Number of decimal places between the standard and smallest unit.
    #[must_use]
    pub fn minor_unit_exponent(&self) -> u32 {
        match self.code() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" => 0,
            "BHD" | "KWD" | "OMR" | "JOD" | "TND" => 3,
            _ => 2,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::INR
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_owned()
    }
}

/// A catalog price in the currency's standard unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Convert to a chargeable [`Amount`], rounding half away from zero to
    /// the currency's smallest unit.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::NotPositive`] if the rounded value is zero or
    /// negative, and [`AmountError::OutOfRange`] if it overflows `u64`.
    pub fn to_amount(&self) -> Result<Amount, AmountError> {
        let scale = Decimal::from(10_u64.pow(self.currency.minor_unit_exponent()));
        let minor = self
            .amount
            .checked_mul(scale)
            .ok_or_else(|| AmountError::OutOfRange(self.amount.to_string()))?
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero);

        if minor <= Decimal::ZERO {
            return Err(AmountError::NotPositive);
        }

        let minor = minor
            .to_u64()
            .ok_or_else(|| AmountError::OutOfRange(self.amount.to_string()))?;
        Amount::new(minor)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.minor_unit_exponent();
        write!(f, "{} {:.*}", self.currency, dp as usize, self.amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_amount_rejects_zero() {
        assert_eq!(Amount::new(0), Err(AmountError::NotPositive));
        assert!(serde_json::from_str::<Amount>("0").is_err());
        assert_eq!(serde_json::from_str::<Amount>("100").unwrap().minor_units(), 100);
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("inr").unwrap(), Currency::INR);
        assert_eq!(Currency::parse("USD").unwrap().code(), "USD");
        assert!(Currency::parse("RUPEE").is_err());
        assert!(Currency::parse("U$D").is_err());
        assert!(Currency::parse("").is_err());
    }

    #[test]
    fn test_currency_serde_as_string() {
        let json = serde_json::to_string(&Currency::INR).unwrap();
        assert_eq!(json, "\"INR\"");
        assert!(serde_json::from_str::<Currency>("\"12A\"").is_err());
    }

    #[test]
    fn test_price_to_amount_two_decimals() {
        let price = Price::new(Decimal::from_str("249.99").unwrap(), Currency::INR);
        assert_eq!(price.to_amount().unwrap().minor_units(), 24_999);
    }

    #[test]
    fn test_price_to_amount_rounds_half_away() {
        let price = Price::new(Decimal::from_str("0.005").unwrap(), Currency::USD);
        assert_eq!(price.to_amount().unwrap().minor_units(), 1);
    }

    #[test]
    fn test_price_to_amount_zero_decimal_currency() {
        let price = Price::new(Decimal::from(1500), Currency::parse("JPY").unwrap());
        assert_eq!(price.to_amount().unwrap().minor_units(), 1500);
    }

    #[test]
    fn test_price_to_amount_rejects_zero() {
        let price = Price::new(Decimal::ZERO, Currency::INR);
        assert_eq!(price.to_amount(), Err(AmountError::NotPositive));
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(Decimal::from_str("145").unwrap(), Currency::INR);
        assert_eq!(price.to_string(), "INR 145.00");
    }
}
