//! Client-side accounts with Argon2id password hashes.

use std::collections::HashMap;
use std::path::Path;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use lumina_core::{Email, UserId, UserRole};
use serde::{Deserialize, Serialize};

use super::{AuthError, CredentialVerifier, VerifiedUser};
use crate::session::StoreError;

/// One account known to a [`LocalVerifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAccount {
    #[serde(default)]
    pub id: Option<UserId>,
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub role: UserRole,
    /// PHC-format Argon2id hash.
    pub password_hash: String,
}

/// Verifies against a fixed set of accounts.
#[derive(Debug, Clone, Default)]
pub struct LocalVerifier {
    accounts: HashMap<Email, LocalAccount>,
}

impl LocalVerifier {
    #[must_use]
    pub fn new(accounts: impl IntoIterator<Item = LocalAccount>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|account| (account.email.clone(), account))
                .collect(),
        }
    }

    /// Load accounts from a JSON array file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let accounts: Vec<LocalAccount> = serde_json::from_str(&contents)?;
        Ok(Self::new(accounts))
    }

    /// Add an account, hashing `password`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PasswordHash`] if hashing fails.
    pub fn with_account(
        mut self,
        email: Email,
        name: &str,
        role: UserRole,
        password: &str,
    ) -> Result<Self, AuthError> {
        let account = LocalAccount {
            id: None,
            name: name.to_string(),
            email: email.clone(),
            role,
            password_hash: hash_password(password)?,
        };
        self.accounts.insert(email, account);
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl CredentialVerifier for LocalVerifier {
    async fn verify(&self, email: &Email, password: &str) -> Result<VerifiedUser, AuthError> {
        let account = self
            .accounts
            .get(email)
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &account.password_hash)?;

        Ok(VerifiedUser {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            token: None,
        })
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns [`AuthError::PasswordHash`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn verifier() -> LocalVerifier {
        LocalVerifier::default()
            .with_account(
                Email::parse("ops@lumina.dev").unwrap(),
                "Ops",
                UserRole::Admin,
                "correct horse battery",
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_verify_returns_configured_role() {
        let email = Email::parse("ops@lumina.dev").unwrap();
        let user = verifier()
            .verify(&email, "correct horse battery")
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.name, "Ops");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let verifier = verifier();
        let known = Email::parse("ops@lumina.dev").unwrap();
        let unknown = Email::parse("admin@lumina.dev").unwrap();

        assert!(matches!(
            verifier.verify(&known, "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verifier.verify(&unknown, "correct horse battery").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_load_accounts_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let accounts = vec![LocalAccount {
            id: Some(UserId::new(7)),
            name: "Vera Vendor".to_string(),
            email: Email::parse("vera@shop.in").unwrap(),
            role: UserRole::Vendor,
            password_hash: hash_password("pw-123456").unwrap(),
        }];
        tokio::fs::write(&path, serde_json::to_string(&accounts).unwrap())
            .await
            .unwrap();

        let verifier = LocalVerifier::load(&path).await.unwrap();
        assert_eq!(verifier.len(), 1);
        let user = verifier
            .verify(&Email::parse("vera@shop.in").unwrap(), "pw-123456")
            .await
            .unwrap();
        assert_eq!(user.id, Some(UserId::new(7)));
        assert_eq!(user.role, UserRole::Vendor);
    }
}
