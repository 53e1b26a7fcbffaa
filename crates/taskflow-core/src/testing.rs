//! Deterministic remote collaborator for store tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use taskflow_storage::{KeyValueStore, MemoryStore, StorageError, StorageResult};
use tokio::sync::Semaphore;

use crate::error::{TaskflowError, TaskflowResult};
use crate::project::model::{NewProject, Project};
use crate::remote::RemoteApi;
use crate::session::codec::TOKEN_KEY;
use crate::session::model::{AuthenticatedUser, CredentialToken, Credentials, RegisterRequest};

pub(crate) struct StubRemote {
    reject_logins: bool,
    reject_registrations: bool,
    projects: Mutex<Vec<Project>>,
    failures: Mutex<VecDeque<TaskflowError>>,
    gate: Option<Semaphore>,
    next_id: AtomicU64,
    project_calls: AtomicUsize,
}

impl StubRemote {
    pub(crate) fn new() -> Self {
        Self {
            reject_logins: false,
            reject_registrations: false,
            projects: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            gate: None,
            next_id: AtomicU64::new(100),
            project_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn rejecting_logins() -> Self {
        Self {
            reject_logins: true,
            ..Self::new()
        }
    }

    pub(crate) fn rejecting_registrations() -> Self {
        Self {
            reject_registrations: true,
            ..Self::new()
        }
    }

    pub(crate) fn seeded() -> Self {
        let stub = Self::new();
        let created = Utc::now() - Duration::days(30);
        *stub.projects.lock().unwrap() = ["1", "2"]
            .into_iter()
            .map(|id| Project {
                id: id.to_string(),
                name: format!("Project {}", id),
                description: String::new(),
                color: "#1976d2".to_string(),
                owner_id: "1".to_string(),
                member_ids: vec!["1".to_string()],
                created_at: created,
                updated_at: created,
                is_completed: false,
            })
            .collect();
        stub
    }

    /// Hold every project call until `release` grants it a permit.
    pub(crate) fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    /// Make the next project call fail with `error`.
    pub(crate) fn fail_next(&self, error: TaskflowError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub(crate) fn project_calls(&self) -> usize {
        self.project_calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> TaskflowResult<()> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| TaskflowError::transport(e.to_string()))?
                .forget();
        }
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn user(&self, id: String, email: &str, name: &str) -> AuthenticatedUser {
        let now = Utc::now();
        AuthenticatedUser {
            id,
            email: email.to_string(),
            name: name.to_string(),
            avatar: None,
            token: CredentialToken::new(format!("stub-token-{}", email)),
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl RemoteApi for StubRemote {
    async fn login(&self, credentials: &Credentials) -> TaskflowResult<AuthenticatedUser> {
        if self.reject_logins {
            return Err(TaskflowError::authentication("invalid credentials"));
        }
        Ok(self.user("1".to_string(), &credentials.email, "John Doe"))
    }

    async fn register(&self, request: &RegisterRequest) -> TaskflowResult<AuthenticatedUser> {
        if self.reject_registrations {
            return Err(TaskflowError::authentication("email already registered"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        Ok(self.user(id, &request.email, &request.name))
    }

    async fn list_projects(&self) -> TaskflowResult<Vec<Project>> {
        self.enter().await?;
        Ok(self.projects.lock().unwrap().clone())
    }

    async fn create_project(&self, project: &NewProject) -> TaskflowResult<Project> {
        self.enter().await?;
        let now = Utc::now();
        let created = Project {
            id: format!("p{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            name: project.name.clone(),
            description: project.description.clone(),
            color: project.color.clone(),
            owner_id: project.owner_id.clone(),
            member_ids: project.member_ids.clone(),
            created_at: now,
            updated_at: now,
            is_completed: false,
        };
        self.projects.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_project(&self, project: &Project) -> TaskflowResult<Project> {
        self.enter().await?;
        let mut projects = self.projects.lock().unwrap();
        let slot = projects
            .iter_mut()
            .find(|p| p.id == project.id)
            .ok_or_else(|| TaskflowError::ProjectNotFound(project.id.clone()))?;
        *slot = project.clone();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &str) -> TaskflowResult<()> {
        self.enter().await?;
        let mut projects = self.projects.lock().unwrap();
        let before = projects.len();
        projects.retain(|p| p.id != id);
        if projects.len() == before {
            return Err(TaskflowError::ProjectNotFound(id.to_string()));
        }
        Ok(())
    }
}

/// A memory store whose token writes can be made to fail.
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    fail_token_writes: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_token_writes: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_token_writes(&self, fail: bool) {
        self.fail_token_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if key == TOKEN_KEY && self.fail_token_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                path: "flaky".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner.remove(key)
    }
}
