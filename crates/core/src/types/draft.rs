//! User-supplied contact details collected by the checkout form.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::email::{Email, EmailError};
use super::phone::{Phone, PhoneError};

/// Errors raised while validating checkout form input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// The name is empty after trimming.
    #[error("name cannot be empty")]
    EmptyName,
    /// The name exceeds the maximum length.
    #[error("name must be at most {max} characters")]
    NameTooLong {
        /// Maximum allowed length in characters.
        max: usize,
    },
    /// The email is malformed.
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),
    /// The phone number is malformed.
    #[error("invalid phone: {0}")]
    Phone(#[from] PhoneError),
}

/// A person's display name, trimmed and non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PersonName(String);

impl PersonName {
    /// Maximum name length in characters.
    pub const MAX_LENGTH: usize = 100;

    /// Parse a name from user input.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::EmptyName`] for blank input and
    /// [`DraftError::NameTooLong`] past [`Self::MAX_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, DraftError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DraftError::EmptyName);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(DraftError::NameTooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated contact details for one checkout attempt.
///
/// A `UserDraft` can only be built through [`UserDraft::parse`], so holding
/// one is proof that the form passed validation. Deserializing runs the same
/// validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawUserDraft")]
pub struct UserDraft {
    /// Full name.
    pub name: PersonName,
    /// Contact email, also the backend's user key.
    pub email: Email,
    /// Phone number with country code.
    pub phone: Phone,
}

impl UserDraft {
    /// Validate raw form fields.
    ///
    /// Fields are checked in form order (name, email, phone) and the first
    /// failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the [`DraftError`] for the first invalid field.
    pub fn parse(name: &str, email: &str, phone: &str) -> Result<Self, DraftError> {
        Ok(Self {
            name: PersonName::parse(name)?,
            email: Email::parse(email)?,
            phone: Phone::parse(phone)?,
        })
    }
}

/// Unvalidated wire form of [`UserDraft`].
#[derive(Deserialize)]
struct RawUserDraft {
    name: String,
    email: String,
    phone: String,
}

impl TryFrom<RawUserDraft> for UserDraft {
    type Error = DraftError;

    fn try_from(raw: RawUserDraft) -> Result<Self, Self::Error> {
        Self::parse(&raw.name, &raw.email, &raw.phone)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_draft() {
        let draft = UserDraft::parse("Jane Doe", "jane@example.com", "+919876543210").unwrap();
        assert_eq!(draft.name.as_str(), "Jane Doe");
        assert_eq!(draft.email.as_str(), "jane@example.com");
        assert_eq!(draft.phone.as_str(), "+919876543210");
    }

    #[test]
    fn test_blank_name_rejected_first() {
        let err = UserDraft::parse("   ", "not-an-email", "123").unwrap_err();
        assert_eq!(err, DraftError::EmptyName);
    }

    #[test]
    fn test_name_too_long() {
        let long = "x".repeat(PersonName::MAX_LENGTH + 1);
        assert!(matches!(
            PersonName::parse(&long),
            Err(DraftError::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_field_errors_are_wrapped() {
        assert!(matches!(
            UserDraft::parse("Jane", "jane", "+919876543210"),
            Err(DraftError::Email(_))
        ));
        assert!(matches!(
            UserDraft::parse("Jane", "jane@example.com", "9876543210"),
            Err(DraftError::Phone(PhoneError::MissingCountryCode))
        ));
    }

    #[test]
    fn test_serializes_as_plain_fields() {
        let draft = UserDraft::parse("Jane Doe", "jane@example.com", "+919876543210").unwrap();
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["name"], "Jane Doe");
        assert_eq!(json["email"], "jane@example.com");
        assert_eq!(json["phone"], "+919876543210");
    }

    #[test]
    fn test_deserialize_validates_fields() {
        let draft: UserDraft = serde_json::from_str(
            r#"{"name":" Jane Doe ","email":"jane@example.com","phone":"+919876543210"}"#,
        )
        .unwrap();
        assert_eq!(draft.name.as_str(), "Jane Doe");

        let blank = serde_json::from_str::<UserDraft>(
            r#"{"name":"","email":"jane@example.com","phone":"+919876543210"}"#,
        );
        assert!(blank.unwrap_err().to_string().contains("name cannot be empty"));

        let bad_email = serde_json::from_str::<UserDraft>(
            r#"{"name":"Jane","email":"not-an-email","phone":"+919876543210"}"#,
        );
        assert!(bad_email.is_err());
    }

    #[test]
    fn test_serialized_draft_reads_back() {
        let draft = UserDraft::parse("Jane Doe", "jane@example.com", "+919876543210").unwrap();
        let json = serde_json::to_string(&draft).unwrap();
        assert_eq!(serde_json::from_str::<UserDraft>(&json).unwrap(), draft);
    }
}
