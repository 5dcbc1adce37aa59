//! Authentication error types.

use lumina_core::UserRole;
use thiserror::Error;

use crate::backend::ApiError;
use crate::session::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] lumina_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No session is active.
    #[error("not logged in")]
    NotLoggedIn,

    /// The session's role is not allowed to do this.
    #[error("{required} role required, logged in as {actual}")]
    Forbidden {
        required: UserRole,
        actual: UserRole,
    },

    /// The backend could not verify credentials.
    #[error("backend error: {0}")]
    Backend(#[from] ApiError),

    /// Local state could not be read or written.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
