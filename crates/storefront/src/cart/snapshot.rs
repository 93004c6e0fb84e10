//! Last-known cart per user, kept on disk for offline display.
//!
//! The snapshot is never a sync source: it is only read when the backend
//! cannot be reached while binding a session.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boutique_core::{CartId, UserId};

use crate::models::CartItem;
use crate::storage::{self, SnapshotError};

use super::state::CartState;

/// Saved cart contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItem>,
    pub saved_at: DateTime<Utc>,
}

impl CartSnapshot {
    /// Capture the items of `state`.
    #[must_use]
    pub fn of(state: &CartState) -> Self {
        Self {
            cart_id: state.current_cart_id,
            items: state.items.clone(),
            saved_at: Utc::now(),
        }
    }
}

/// Stores one snapshot per user under `<state_dir>/carts/<user_id>.json`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `state_dir`.
    #[must_use]
    pub fn new(state_dir: &Path) -> Self {
        Self {
            dir: state_dir.join("carts"),
        }
    }

    fn path(&self, user_id: UserId) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }

    /// Load the snapshot of `user_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the file exists but cannot be read.
    pub async fn load(&self, user_id: UserId) -> Result<Option<CartSnapshot>, SnapshotError> {
        storage::read_json(&self.path(user_id)).await
    }

    /// Save the snapshot of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the file cannot be written.
    pub async fn save(&self, user_id: UserId, snapshot: &CartSnapshot) -> Result<(), SnapshotError> {
        storage::write_json(&self.path(user_id), snapshot, false).await
    }

    /// Forget the snapshot of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the file exists but cannot be removed.
    pub async fn clear(&self, user_id: UserId) -> Result<(), SnapshotError> {
        storage::remove(&self.path(user_id)).await
    }
}
