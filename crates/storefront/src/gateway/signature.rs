//! Payment signature verification.
//!
//! The hosted gateway signs each successful payment with the merchant's key
//! secret: `hex(HMAC-SHA256(secret, "<order_id>|<payment_id>"))`. Checking it
//! proves the payment id was issued for that order and not replayed from
//! another one.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Errors for [`verify_payment_signature`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The key secret could not be used as an HMAC key.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// The signature is not hex.
    #[error("signature is not valid hex")]
    Malformed,

    /// The signature does not match the order and payment.
    #[error("signature mismatch")]
    Mismatch,
}

fn mac(secret: &[u8], order_id: &str, payment_id: &str) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

/// Compute the signature the gateway would attach to a payment.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKey`] if the secret is unusable.
pub fn sign_payment(
    secret: &[u8],
    order_id: &str,
    payment_id: &str,
) -> Result<String, SignatureError> {
    Ok(hex::encode(
        mac(secret, order_id, payment_id)?.finalize().into_bytes(),
    ))
}

/// Verify a gateway payment signature in constant time.
///
/// # Errors
///
/// Returns [`SignatureError::Mismatch`] if the signature was not produced for
/// this order and payment.
pub fn verify_payment_signature(
    secret: &[u8],
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    let provided = hex::decode(signature.trim()).map_err(|_| SignatureError::Malformed)?;
    mac(secret, order_id, payment_id)?
        .verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-key-secret";

    #[test]
    fn test_signature_verifies() {
        let signature = sign_payment(SECRET, "order_abc", "pay_123").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify_payment_signature(SECRET, "order_abc", "pay_123", &signature).is_ok());
    }

    #[test]
    fn test_signature_bound_to_order() {
        let signature = sign_payment(SECRET, "order_abc", "pay_123").unwrap();
        assert_eq!(
            verify_payment_signature(SECRET, "order_other", "pay_123", &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_signature_bound_to_secret() {
        let signature = sign_payment(b"another-secret", "order_abc", "pay_123").unwrap();
        assert_eq!(
            verify_payment_signature(SECRET, "order_abc", "pay_123", &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_malformed_signature() {
        assert_eq!(
            verify_payment_signature(SECRET, "order_abc", "pay_123", "not-hex"),
            Err(SignatureError::Malformed)
        );
    }
}
