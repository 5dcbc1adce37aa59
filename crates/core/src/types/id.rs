//! Newtype IDs for type-safe entity references.
//!
//! Two flavours exist:
//! - [`define_id!`] wraps the backend's integer primary keys
//! - [`define_token!`] wraps opaque string identifiers issued by the backend
//!   or the payment gateway (e.g. `order_abc`, `pay_123`)

/// Macro to define a type-safe integer ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use lumina_core::define_id;
/// define_id!(VendorId);
///
/// let vendor_id = VendorId::new(7);
/// assert_eq!(vendor_id.as_i64(), 7);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Macro to define an opaque, non-empty string identifier.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - `parse()` rejecting blank input, `as_str()`, `Display`
///
/// Deserialization does not re-validate; presence checks for backend
/// payloads happen where the payload is decoded.
///
/// # Example
///
/// ```rust
/// # use lumina_core::define_token;
/// define_token!(RefundId);
///
/// assert!(RefundId::parse("rfnd_1").is_some());
/// assert!(RefundId::parse("  ").is_none());
/// ```
#[macro_export]
macro_rules! define_token {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an identifier, returning `None` for blank input.
            #[must_use]
            pub fn parse(s: &str) -> Option<Self> {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(Self(s.to_owned()))
                }
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the identifier is blank.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(CustomerId);
define_id!(ProductId);
define_id!(VendorId);
define_id!(MarketplaceOrderId);

define_token!(OrderId);
define_token!(PaymentId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_parse_trims_and_rejects_blank() {
        assert_eq!(OrderId::parse(" order_abc ").unwrap().as_str(), "order_abc");
        assert!(OrderId::parse("").is_none());
        assert!(PaymentId::parse("\t").is_none());
    }

    #[test]
    fn test_token_blank_detection_after_deserialize() {
        let id: PaymentId = serde_json::from_str("\"\"").unwrap();
        assert!(id.is_blank());
    }

    #[test]
    fn test_integer_id_roundtrip() {
        let id = ProductId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(i64::from(id), 42);
    }
}
