//! Saved session file.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{AuthUser, User};
use crate::storage::{self, SnapshotError};

const SESSION_FILE: &str = "session.json";

/// On-disk form of an [`AuthUser`]. Only exists while being read or written.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    user: User,
    token: String,
}

/// Persists the logged-in user and token to `<state_dir>/session.json`.
///
/// The file is written with owner-only permissions on Unix.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at `state_dir`.
    #[must_use]
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(SESSION_FILE),
        }
    }

    /// Path of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved session, if any.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the file exists but cannot be read.
    pub async fn load(&self) -> Result<Option<AuthUser>, SnapshotError> {
        let stored: Option<StoredSession> = storage::read_json(&self.path).await?;
        Ok(stored.map(|s| AuthUser::new(s.user, SecretString::from(s.token))))
    }

    /// Save the session.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the file cannot be written.
    pub async fn save(&self, auth: &AuthUser) -> Result<(), SnapshotError> {
        let stored = StoredSession {
            user: auth.user.clone(),
            token: auth.token.expose_secret().to_string(),
        };
        storage::write_json(&self.path, &stored, true).await?;
        debug!(user_id = %auth.user.id, "Session saved");
        Ok(())
    }

    /// Remove the saved session.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the file exists but cannot be removed.
    pub async fn clear(&self) -> Result<(), SnapshotError> {
        storage::remove(&self.path).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::{Email, Role, UserId};

    use super::*;

    fn auth_user() -> AuthUser {
        AuthUser::new(
            User {
                id: UserId::new(7),
                name: "Lea Martin".to_string(),
                email: Email::parse("lea@boutique.fr").unwrap(),
                role: Role::Client,
            },
            SecretString::from("token-abc"),
        )
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        assert!(store.load().await.unwrap().is_none());

        store.save(&auth_user()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, auth_user());
        assert_eq!(loaded.token.expose_secret(), "token-abc");

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
