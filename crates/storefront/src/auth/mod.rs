//! Credential verification and role checks.
//!
//! Verification is pluggable through [`CredentialVerifier`]:
//! - [`BackendVerifier`] asks the backend (`POST /login`)
//! - [`LocalVerifier`] checks Argon2id hashes held by the client, for demos
//!   and offline use
//!
//! Roles always come from the verifier. Nothing here looks at the shape of
//! an email address to decide what a user may do.

mod error;
mod local;

pub use error::AuthError;
pub use local::{LocalAccount, LocalVerifier, hash_password};

use async_trait::async_trait;
use lumina_core::{Email, UserId, UserRole};
use tracing::instrument;

use crate::backend::{ApiError, BackendClient};
use crate::session::UserSession;

/// Identity returned by a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub id: Option<UserId>,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    /// Opaque token issued by the verifier, if any.
    pub token: Option<String>,
}

/// Checks an email/password pair.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verify credentials.
    ///
    /// Implementations return [`AuthError::InvalidCredentials`] for unknown
    /// users and wrong passwords alike.
    async fn verify(&self, email: &Email, password: &str) -> Result<VerifiedUser, AuthError>;
}

/// Verifies against the backend's `/login` endpoint.
#[derive(Debug, Clone)]
pub struct BackendVerifier {
    backend: BackendClient,
}

impl BackendVerifier {
    #[must_use]
    pub const fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CredentialVerifier for BackendVerifier {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn verify(&self, email: &Email, password: &str) -> Result<VerifiedUser, AuthError> {
        let data = self
            .backend
            .login(email, password)
            .await
            .map_err(|err| match err {
                ApiError::Rejected {
                    status: 400 | 401 | 403 | 404,
                    ..
                } => AuthError::InvalidCredentials,
                other => AuthError::Backend(other),
            })?;

        Ok(VerifiedUser {
            id: data.id.map(UserId::new),
            name: data
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| email.local_part().to_string()),
            email: email.clone(),
            role: data.role.unwrap_or_default(),
            token: data.token,
        })
    }
}

/// Require a logged-in user with `role`. Admins pass every check.
///
/// # Errors
///
/// Returns [`AuthError::NotLoggedIn`] without a session and
/// [`AuthError::Forbidden`] when the role does not match.
pub fn require_role(session: Option<&UserSession>, role: UserRole) -> Result<&UserSession, AuthError> {
    let session = session.ok_or(AuthError::NotLoggedIn)?;
    if session.role == role || session.role == UserRole::Admin {
        Ok(session)
    } else {
        Err(AuthError::Forbidden {
            required: role,
            actual: session.role,
        })
    }
}
