//! Local user session and cart.
//!
//! [`SessionManager`] is the only component that reads or writes
//! [`LocalState`]. It is a convenience for the client, not a security
//! boundary: anything stored here can be edited by whoever owns the file.

mod store;

pub use store::{FileStateStore, LocalState, LocalStateStore, MemoryStateStore, StoreError};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lumina_core::{Email, UserId, UserRole};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{AuthError, CredentialVerifier, VerifiedUser};
use crate::checkout::Cart;
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};

/// The logged-in user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub session_id: Uuid,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserSession {
    /// Start a session for a verified user.
    #[must_use]
    pub fn new(user: VerifiedUser) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            token: user.token,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for UserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSession")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Login, logout, and access to the persisted cart.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn LocalStateStore>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStateStore>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Verify credentials and replace any existing session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for bad credentials, or a
    /// store error if the session cannot be saved.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let email = Email::parse(email)?;
        let user = self.verifier.verify(&email, password).await?;
        let session = UserSession::new(user);

        let mut state = self.store.load().await?;
        state.session = Some(session.clone());
        self.store.save(&state).await?;

        set_sentry_user(&session.session_id, Some(session.email.as_str()));
        let role = session.role.to_string();
        add_breadcrumb("auth", "Logged in", Some(&[("role", role.as_str())]));
        info!(role = %session.role, "User logged in");
        Ok(session)
    }

    /// Destroy the current session. Returns `false` if nobody was logged in.
    ///
    /// The cart is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if local state cannot be read or written.
    pub async fn logout(&self) -> Result<bool, StoreError> {
        let mut state = self.store.load().await?;
        let had_session = state.session.take().is_some();
        if had_session {
            self.store.save(&state).await?;
            clear_sentry_user();
            info!("User logged out");
        }
        Ok(had_session)
    }

    /// The current session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if local state cannot be read.
    pub async fn current(&self) -> Result<Option<UserSession>, StoreError> {
        Ok(self.store.load().await?.session)
    }

    /// The persisted cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if local state cannot be read.
    pub async fn cart(&self) -> Result<Cart, StoreError> {
        Ok(self.store.load().await?.cart)
    }

    /// Modify the cart and persist the result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if local state cannot be read or written.
    pub async fn update_cart<R>(&self, f: impl FnOnce(&mut Cart) -> R + Send) -> Result<R, StoreError> {
        let mut state = self.store.load().await?;
        let result = f(&mut state.cart);
        self.store.save(&state).await?;
        Ok(result)
    }

    /// Replace the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if local state cannot be read or written.
    pub async fn save_cart(&self, cart: Cart) -> Result<(), StoreError> {
        self.update_cart(move |current| *current = cart).await
    }
}
