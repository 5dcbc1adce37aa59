//! Backend API error types.

use thiserror::Error;

/// Errors that can occur when calling the Lumina backend.
///
/// Every failure is classified as one of: the request never got a usable
/// answer ([`ApiError::Network`]), the backend answered and refused
/// ([`ApiError::Rejected`]), or the backend claimed success with a payload
/// that cannot be trusted ([`ApiError::MalformedResponse`]).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The backend reported a non-success status.
    #[error("backend rejected request (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code of the response.
        status: u16,
        /// Message from the backend, verbatim when one was provided.
        message: String,
    },

    /// A success response was missing required fields or did not parse.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// The HTTP client or a request URL could not be built.
    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl ApiError {
    /// Returns `true` for transport-level failures.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns `true` when the backend answered but refused the request.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::MalformedResponse(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if err.is_builder() {
            Self::Setup(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Error body shapes the backend uses.
///
/// Handlers built on the backend's own envelope return
/// `{"status": "error", "message": ...}`; framework-level errors return
/// `{"detail": ...}`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ErrorBody {
    /// Envelope status (`"success"` or `"error"`).
    #[serde(default)]
    pub status: Option<String>,
    /// Envelope error message.
    #[serde(default)]
    pub message: Option<String>,
    /// Framework error detail.
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Best human-readable message in the body, if any.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        if let Some(message) = self.message.as_ref().filter(|m| !m.trim().is_empty()) {
            return Some(message.clone());
        }
        match &self.detail {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Rejected {
            status: 400,
            message: "Email already registered".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "backend rejected request (HTTP 400): Email already registered"
        );
        assert!(err.is_rejected());
        assert!(!err.is_network());
    }

    #[test]
    fn test_error_body_prefers_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"status":"error","message":"Razorpay Error: bad amount"}"#)
                .expect("deserialize");
        assert_eq!(body.message().as_deref(), Some("Razorpay Error: bad amount"));
    }

    #[test]
    fn test_error_body_falls_back_to_detail() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail":"Product 3 is out of stock or does not exist."}"#)
                .expect("deserialize");
        assert_eq!(
            body.message().as_deref(),
            Some("Product 3 is out of stock or does not exist.")
        );

        let body: ErrorBody = serde_json::from_str(r#"{"detail":[{"loc":["body","amount"]}]}"#)
            .expect("deserialize");
        assert!(body.message().is_some_and(|m| m.contains("amount")));
    }
}
