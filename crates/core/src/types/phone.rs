//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The number does not start with a `+` country code prefix.
    #[error("phone number must include a country code (e.g. +91)")]
    MissingCountryCode,
    /// The input contains characters other than digits and separators.
    #[error("phone number may only contain digits, spaces, dashes and parentheses")]
    InvalidCharacter,
    /// The digit count is outside the E.164 range.
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
    /// Country codes never start with zero.
    #[error("country code cannot start with 0")]
    LeadingZero,
}

/// A phone number in international (E.164) form, including country code.
///
/// Separators (spaces, dashes, dots, parentheses) are accepted on input and
/// stripped, so `+91 98765-43210` is stored as `+919876543210`.
///
/// ```
/// use lumina_core::Phone;
///
/// let phone = Phone::parse("+91 98765 43210").unwrap();
/// assert_eq!(phone.as_str(), "+919876543210");
///
/// assert!(Phone::parse("9876543210").is_err()); // no country code
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum digit count (country code + subscriber number).
    pub const MIN_DIGITS: usize = 8;
    /// Maximum digit count allowed by E.164.
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `Phone` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, lacks a leading `+`, contains
    /// letters or other symbols, or has a digit count outside 8-15.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let rest = s.strip_prefix('+').ok_or(PhoneError::MissingCountryCode)?;

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(PhoneError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        if digits.starts_with('0') {
            return Err(PhoneError::LeadingZero);
        }

        Ok(Self(format!("+{digits}")))
    }

    /// Returns the normalized number, including the leading `+`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the digits without the leading `+`.
    #[must_use]
    pub fn digits(&self) -> &str {
        self.0.trim_start_matches('+')
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(
            Phone::parse("+919876543210").unwrap().as_str(),
            "+919876543210"
        );
        assert_eq!(
            Phone::parse("+1 (415) 523-8886").unwrap().as_str(),
            "+14155238886"
        );
    }

    #[test]
    fn test_digits() {
        let phone = Phone::parse("+919876543210").unwrap();
        assert_eq!(phone.digits(), "919876543210");
    }

    #[test]
    fn test_missing_country_code() {
        assert_eq!(
            Phone::parse("9876543210"),
            Err(PhoneError::MissingCountryCode)
        );
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(
            Phone::parse("+91abc43210"),
            Err(PhoneError::InvalidCharacter)
        );
    }

    #[test]
    fn test_length_bounds() {
        assert!(matches!(
            Phone::parse("+1234"),
            Err(PhoneError::InvalidLength { .. })
        ));
        assert!(matches!(
            Phone::parse("+1234567890123456"),
            Err(PhoneError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_leading_zero() {
        assert_eq!(Phone::parse("+0919876543"), Err(PhoneError::LeadingZero));
    }

    #[test]
    fn test_empty() {
        assert_eq!(Phone::parse("  "), Err(PhoneError::Empty));
    }
}
