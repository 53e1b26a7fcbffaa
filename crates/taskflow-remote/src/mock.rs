//! In-memory remote collaborator.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskflow_core::{
    AuthenticatedUser, CredentialToken, Credentials, NewProject, Project, RegisterRequest,
    RemoteApi, TaskflowError, TaskflowResult,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::seed;

/// Remote operations, for targeting injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOp {
    Login,
    Register,
    ListProjects,
    CreateProject,
    UpdateProject,
    DeleteProject,
}

impl RemoteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::ListProjects => "list_projects",
            Self::CreateProject => "create_project",
            Self::UpdateProject => "update_project",
            Self::DeleteProject => "delete_project",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockRemoteConfig {
    /// Simulated latency of `list_projects`.
    pub list_latency_ms: u64,
    /// Simulated latency of project create/update/delete.
    pub mutation_latency_ms: u64,
    /// Simulated latency of login/register.
    pub auth_latency_ms: u64,
    pub seed_demo_projects: bool,
}

impl Default for MockRemoteConfig {
    fn default() -> Self {
        Self {
            list_latency_ms: 500,
            mutation_latency_ms: 300,
            auth_latency_ms: 0,
            seed_demo_projects: true,
        }
    }
}

impl MockRemoteConfig {
    /// No latency, demo data seeded.
    pub fn instant() -> Self {
        Self::with_latency(0)
    }

    /// The same latency for every operation.
    pub fn with_latency(ms: u64) -> Self {
        Self {
            list_latency_ms: ms,
            mutation_latency_ms: ms,
            auth_latency_ms: ms,
            seed_demo_projects: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
}

/// The TaskFlow API, held in memory.
pub struct MockRemote {
    config: MockRemoteConfig,
    projects: RwLock<Vec<Project>>,
    accounts: RwLock<HashMap<String, Account>>,
    failures: Mutex<HashMap<RemoteOp, VecDeque<TaskflowError>>>,
}

impl MockRemote {
    pub fn new(config: MockRemoteConfig) -> Self {
        let projects = if config.seed_demo_projects {
            seed::demo_projects()
        } else {
            Vec::new()
        };
        debug!(
            seeded = projects.len(),
            list_latency_ms = config.list_latency_ms,
            mutation_latency_ms = config.mutation_latency_ms,
            "MockRemote initialized"
        );
        Self {
            config,
            projects: RwLock::new(projects),
            accounts: RwLock::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a one-shot failure for the next call of `op`.
    pub fn fail_next(&self, op: RemoteOp, error: TaskflowError) {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Projects currently held server-side.
    pub async fn stored_projects(&self) -> Vec<Project> {
        self.projects.read().await.clone()
    }

    async fn enter(&self, op: RemoteOp, latency_ms: u64) -> TaskflowResult<()> {
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
        let injected = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(error) => {
                debug!(op = op.as_str(), error = %error, "Injected failure");
                Err(error)
            }
            None => {
                debug!(op = op.as_str(), "Remote call");
                Ok(())
            }
        }
    }

    fn issue_user(
        &self,
        id: String,
        email: &str,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> AuthenticatedUser {
        AuthenticatedUser {
            id,
            email: email.to_string(),
            name: name.to_string(),
            avatar: Some(seed::avatar_for(email)),
            token: CredentialToken::new(format!("mock_jwt_{}", Uuid::new_v4().simple())),
            created_at,
            updated_at: Utc::now(),
        }
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new(MockRemoteConfig::default())
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn login(&self, credentials: &Credentials) -> TaskflowResult<AuthenticatedUser> {
        self.enter(RemoteOp::Login, self.config.auth_latency_ms).await?;
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(TaskflowError::authentication("email and password are required"));
        }

        let account = self.accounts.read().await.get(&credentials.email).cloned();
        Ok(match account {
            Some(account) => self.issue_user(
                account.id,
                &credentials.email,
                &account.name,
                account.created_at,
            ),
            None => self.issue_user(
                seed::DEMO_USER_ID.to_string(),
                &credentials.email,
                seed::DEMO_USER_NAME,
                seed::demo_account_created_at(),
            ),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> TaskflowResult<AuthenticatedUser> {
        self.enter(RemoteOp::Register, self.config.auth_latency_ms).await?;
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(TaskflowError::authentication("email and password are required"));
        }

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&request.email) {
            return Err(TaskflowError::authentication(format!(
                "'{}' is already registered",
                request.email
            )));
        }

        let account = Account {
            id: Uuid::new_v4().to_string(),
            name: request.name.clone(),
            created_at: Utc::now(),
        };
        accounts.insert(request.email.clone(), account.clone());
        Ok(self.issue_user(account.id, &request.email, &account.name, account.created_at))
    }

    async fn list_projects(&self) -> TaskflowResult<Vec<Project>> {
        self.enter(RemoteOp::ListProjects, self.config.list_latency_ms).await?;
        Ok(self.projects.read().await.clone())
    }

    async fn create_project(&self, project: &NewProject) -> TaskflowResult<Project> {
        self.enter(RemoteOp::CreateProject, self.config.mutation_latency_ms).await?;
        let now = Utc::now();
        let created = Project {
            id: Uuid::new_v4().to_string(),
            name: project.name.clone(),
            description: project.description.clone(),
            color: project.color.clone(),
            owner_id: project.owner_id.clone(),
            member_ids: project.member_ids.clone(),
            created_at: now,
            updated_at: now,
            is_completed: false,
        };
        self.projects.write().await.push(created.clone());
        Ok(created)
    }

    async fn update_project(&self, project: &Project) -> TaskflowResult<Project> {
        self.enter(RemoteOp::UpdateProject, self.config.mutation_latency_ms).await?;
        let mut projects = self.projects.write().await;
        let slot = projects
            .iter_mut()
            .find(|p| p.id == project.id)
            .ok_or_else(|| TaskflowError::ProjectNotFound(project.id.clone()))?;
        *slot = Project {
            created_at: slot.created_at,
            ..project.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_project(&self, id: &str) -> TaskflowResult<()> {
        self.enter(RemoteOp::DeleteProject, self.config.mutation_latency_ms).await?;
        let mut projects = self.projects.write().await;
        let position = projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| TaskflowError::ProjectNotFound(id.to_string()))?;
        projects.remove(position);
        Ok(())
    }
}
