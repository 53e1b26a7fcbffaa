//! Remote collaborator boundary.
//!
//! Everything the stores need from the network. Production wires a real
//! transport; tests wire a deterministic in-memory implementation.

use async_trait::async_trait;

use crate::error::TaskflowResult;
use crate::project::model::{NewProject, Project};
use crate::session::model::{AuthenticatedUser, Credentials, RegisterRequest};

/// Authentication and project persistence service.
///
/// Any operation may fail with `TaskflowError::Transport`.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Fails with `TaskflowError::Authentication` on bad credentials.
    async fn login(&self, credentials: &Credentials) -> TaskflowResult<AuthenticatedUser>;

    /// Fails with `TaskflowError::Authentication` when the account cannot be created.
    async fn register(&self, request: &RegisterRequest) -> TaskflowResult<AuthenticatedUser>;

    async fn list_projects(&self) -> TaskflowResult<Vec<Project>>;

    /// Assigns the identifier and timestamps.
    async fn create_project(&self, project: &NewProject) -> TaskflowResult<Project>;

    /// Fails with `TaskflowError::ProjectNotFound` for an unknown id.
    async fn update_project(&self, project: &Project) -> TaskflowResult<Project>;

    /// Fails with `TaskflowError::ProjectNotFound` for an unknown id.
    async fn delete_project(&self, id: &str) -> TaskflowResult<()>;
}
