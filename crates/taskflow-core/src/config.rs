//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::error::{TaskflowError, TaskflowResult};

/// Who owns a project created while no session is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OwnershipPolicy {
    /// Refuse the creation with `TaskflowError::NotAuthenticated`.
    #[default]
    RequireSession,
    /// Assign a fixed owner id.
    Placeholder { owner_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub ownership: OwnershipPolicy,
    /// Drop the loaded projects when the signed-in user goes away or changes.
    pub reset_projects_on_logout: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ownership: OwnershipPolicy::default(),
            reset_projects_on_logout: true,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> TaskflowResult<()> {
        if let OwnershipPolicy::Placeholder { owner_id } = &self.ownership {
            if owner_id.trim().is_empty() {
                return Err(TaskflowError::Config(
                    "placeholder ownership needs a non-empty owner_id".to_string(),
                ));
            }
        }
        Ok(())
    }
}
