use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::auth::session::User;

/// File name of the persisted session inside the data directory
const SESSION_FILE: &str = "session.json";

/// Persisted session payload with an integrity check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    /// Opaque bearer token; never inspected, only carried
    pub token: String,
    /// Cached user record from the last successful login/registration
    pub user: User,
    /// When this payload was written
    pub saved_at: DateTime<Utc>,
    /// Hash to verify payload integrity
    integrity_hash: String,
}

/// Durable storage for the credential token and cached user record.
///
/// Token and user are written together and cleared together; there is no
/// partial state on disk. Only the session store writes here — everything
/// else reads through `has_token` or the store's snapshot.
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    /// Create storage rooted at the given data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(SESSION_FILE),
        }
    }

    /// Path of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a token and user record together
    pub async fn save(&self, token: &str, user: &User) -> Result<()> {
        let payload = StoredSession {
            token: token.to_string(),
            user: user.clone(),
            saved_at: Utc::now(),
            integrity_hash: integrity_hash(token, user),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let body = serde_json::to_string_pretty(&payload)?;
        fs::write(&self.path, body)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;

        info!(path = %self.path.display(), "Session stored");
        Ok(())
    }

    /// Retrieve the persisted session, verifying its integrity.
    ///
    /// Returns `Ok(None)` when nothing is stored; fails when the payload is
    /// unreadable or does not match its integrity hash.
    pub async fn load(&self) -> Result<Option<StoredSession>> {
        if !fs::try_exists(&self.path).await? {
            debug!("No session file found");
            return Ok(None);
        }

        let body = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let payload: StoredSession =
            serde_json::from_str(&body).context("failed to decode stored session")?;

        let expected = integrity_hash(&payload.token, &payload.user);
        if expected != payload.integrity_hash {
            warn!(
                path = %self.path.display(),
                "Stored session failed integrity verification, possible tampering"
            );
            return Err(anyhow!("stored session failed integrity verification"));
        }

        debug!(username = %payload.user.username, "Session retrieved from storage");
        Ok(Some(payload))
    }

    /// Remove the persisted session; idempotent
    pub async fn clear(&self) -> Result<()> {
        if fs::try_exists(&self.path).await? {
            fs::remove_file(&self.path)
                .await
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
            info!(path = %self.path.display(), "Session removed from storage");
        } else {
            debug!("No session file to remove");
        }
        Ok(())
    }

    /// Cheap presence check. Does not validate the token against the server
    /// and does not verify the payload.
    pub async fn has_token(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }
}

/// Hash over the fields that must not change behind our back
fn integrity_hash(token: &str, user: &User) -> String {
    let fields = format!("{}:{}:{}:{}", token, user.id, user.username, user.email);
    let mut hasher = Sha256::new();
    hasher.update(fields.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ann() -> User {
        User {
            id: 1,
            username: "ann".to_string(),
            email: "ann@x.com".to_string(),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());

        assert!(!storage.has_token().await);
        storage.save("tok-1", &ann()).await.unwrap();
        assert!(storage.has_token().await);

        let stored = storage.load().await.unwrap().unwrap();
        assert_eq!(stored.token, "tok-1");
        assert_eq!(stored.user, ann());
    }

    #[tokio::test]
    async fn clear_removes_token_and_user_together() {
        let dir = tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());

        storage.save("tok-1", &ann()).await.unwrap();
        storage.clear().await.unwrap();

        assert!(!storage.has_token().await);
        assert!(storage.load().await.unwrap().is_none());

        // Clearing again is fine
        storage.clear().await.unwrap();
    }

    #[tokio::test]
    async fn tampered_payload_fails_verification() {
        let dir = tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        storage.save("tok-1", &ann()).await.unwrap();

        let body = std::fs::read_to_string(storage.path()).unwrap();
        let tampered = body.replace("tok-1", "tok-2");
        std::fs::write(storage.path(), tampered).unwrap();

        assert!(storage.load().await.is_err());
    }

    #[tokio::test]
    async fn garbage_payload_is_an_error_not_a_panic() {
        let dir = tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        std::fs::write(storage.path(), "not json").unwrap();

        assert!(storage.load().await.is_err());
        // Presence check is shape-blind
        assert!(storage.has_token().await);
    }
}
