//! Persistent local state: the logged-in user and the cart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::UserSession;
use crate::checkout::Cart;

/// Errors reading or writing local state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("local state I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The state file exists but is not valid JSON.
    #[error("local state is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Everything the client keeps between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub session: Option<UserSession>,
    #[serde(default)]
    pub cart: Cart,
}

/// Where [`LocalState`] lives.
#[async_trait]
pub trait LocalStateStore: Send + Sync {
    /// Load state, returning the default when nothing was saved yet.
    async fn load(&self) -> Result<LocalState, StoreError>;

    /// Replace the saved state.
    async fn save(&self, state: &LocalState) -> Result<(), StoreError>;
}

/// JSON file store.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LocalStateStore for FileStateStore {
    async fn load(&self) -> Result<LocalState, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No local state yet");
                return Ok(LocalState::default());
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(LocalState::default());
        }

        serde_json::from_str(&contents).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Local state file is corrupt");
            StoreError::Corrupt(e)
        })
    }

    async fn save(&self, state: &LocalState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<LocalState>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new(state: LocalState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

#[async_trait]
impl LocalStateStore for MemoryStateStore {
    async fn load(&self) -> Result<LocalState, StoreError> {
        Ok(self.state.lock().await.clone())
    }

    async fn save(&self, state: &LocalState) -> Result<(), StoreError> {
        state.clone_into(&mut *self.state.lock().await);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use lumina_core::{ProductId, VendorId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::backend::Product;

    fn cart_with_one_item() -> Cart {
        let mut cart = Cart::default();
        cart.add(
            &Product {
                id: ProductId::new(1),
                name: "Desk Lamp".to_string(),
                slug: None,
                description: None,
                price: Decimal::from_str("145.00").unwrap(),
                stock_qty: 3,
                images: None,
                vendor_id: VendorId::new(2),
            },
            2,
        );
        cart
    }

    #[tokio::test]
    async fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().await.unwrap(), LocalState::default());
    }

    #[tokio::test]
    async fn test_file_store_persists_cart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = FileStateStore::new(&path);

        let state = LocalState {
            session: None,
            cart: cart_with_one_item(),
        };
        store.save(&state).await.unwrap();

        let reopened = FileStateStore::new(&path);
        assert_eq!(reopened.load().await.unwrap(), state);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = FileStateStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStateStore::default();
        let state = LocalState {
            session: None,
            cart: cart_with_one_item(),
        };
        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap().cart.item_count(), 2);
    }
}
