//! Persisted session codec.
//!
//! The session occupies two slots: `auth_token` holds the raw token and
//! `user_data` holds the profile as JSON. Both must be present and readable
//! for a session to be restored; anything else is cleared.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskflow_storage::KeyValueStore;
use tracing::{debug, warn};

use crate::error::{TaskflowError, TaskflowResult};
use crate::session::model::{AuthenticatedUser, CredentialToken};

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "user_data";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProfile {
    id: String,
    email: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Encodes a session to, and decodes it from, a key-value store.
#[derive(Clone)]
pub struct SessionCodec {
    store: Arc<dyn KeyValueStore>,
}

impl SessionCodec {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist `user` and its token.
    ///
    /// On failure the slots hold the previous session, or nothing; never a
    /// profile paired with another user's token.
    pub fn save(&self, user: &AuthenticatedUser) -> TaskflowResult<()> {
        let profile = StoredProfile {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        };
        let encoded = serde_json::to_string(&profile)?;
        let previous = self.store.get(USER_KEY)?;

        self.store.set(USER_KEY, &encoded)?;
        if let Err(e) = self.store.set(TOKEN_KEY, user.token.expose()) {
            warn!(user_id = %user.id, error = %e, "Failed to persist token, rolling back profile");
            self.restore_profile(previous);
            return Err(e.into());
        }
        debug!(user_id = %user.id, "Persisted session");
        Ok(())
    }

    fn restore_profile(&self, previous: Option<String>) {
        let restored = match previous {
            Some(data) => self.store.set(USER_KEY, &data),
            None => self.store.remove(USER_KEY),
        };
        if let Err(e) = restored {
            warn!(error = %e, "Rollback failed, clearing persisted session");
            self.clear();
        }
    }

    /// Restore the persisted session.
    ///
    /// Unreadable or partial data counts as absent and is cleared.
    pub fn load(&self) -> Option<AuthenticatedUser> {
        match self.decode() {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored session");
                self.clear();
                None
            }
        }
    }

    /// Strict variant of `load`: reports corruption instead of recovering.
    pub fn decode(&self) -> TaskflowResult<Option<AuthenticatedUser>> {
        let token = self.store.get(TOKEN_KEY).map_err(corruption)?;
        let data = self.store.get(USER_KEY).map_err(corruption)?;

        let (token, data) = match (token, data) {
            (None, None) => return Ok(None),
            (Some(token), Some(data)) => (token, data),
            (Some(_), None) => {
                return Err(TaskflowError::StorageCorruption(format!(
                    "'{}' present without '{}'",
                    TOKEN_KEY, USER_KEY
                )))
            }
            (None, Some(_)) => {
                return Err(TaskflowError::StorageCorruption(format!(
                    "'{}' present without '{}'",
                    USER_KEY, TOKEN_KEY
                )))
            }
        };

        if token.is_empty() {
            return Err(TaskflowError::StorageCorruption("empty token".to_string()));
        }

        let profile: StoredProfile = serde_json::from_str(&data).map_err(corruption)?;
        Ok(Some(AuthenticatedUser {
            id: profile.id,
            email: profile.email,
            name: profile.name,
            avatar: profile.avatar,
            token: CredentialToken::new(token),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }))
    }

    /// Erase both slots. Failures are logged; the caller cannot act on them.
    pub fn clear(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to clear persisted session slot");
            }
        }
    }
}

fn corruption(e: impl std::fmt::Display) -> TaskflowError {
    TaskflowError::StorageCorruption(e.to_string())
}
