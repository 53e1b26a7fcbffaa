//! Project collection store.
//!
//! # Responsibility
//! - Own the in-memory project list and its loading flag.
//! - Run project CRUD against the remote collaborator.
//!
//! # Invariants
//! - The loading flag is true while at least one operation is in flight and
//!   is cleared when the last one settles, whether it succeeded, failed or
//!   was dropped mid-flight.
//! - A successful operation updates the list and the flag in one step.
//! - Results of operations issued before a reset are discarded.

pub mod model;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{OwnershipPolicy, StoreConfig};
use crate::error::{TaskflowError, TaskflowResult};
use crate::remote::RemoteApi;
use crate::session::{SessionState, SessionStore};
use crate::state::{Derived, StateCell, Subscription};
use model::{
    CollectionState, CreateProjectRequest, NewProject, Project, ProjectStats, UpdateProjectRequest,
};

/// Owns the project collection.
pub struct ProjectStore {
    remote: Arc<dyn RemoteApi>,
    session: Arc<SessionStore>,
    config: StoreConfig,
    state: StateCell<CollectionState<Project>>,
    in_flight: Arc<AtomicUsize>,
    epoch: Arc<AtomicU64>,
    watch: Derived<CollectionState<Project>>,
    projects: Derived<Vec<Project>>,
    loading: Derived<bool>,
    stats: Derived<ProjectStats>,
    _session_watch: Option<Subscription>,
}

impl ProjectStore {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        session: Arc<SessionStore>,
        config: StoreConfig,
    ) -> TaskflowResult<Self> {
        config.validate()?;

        let state = StateCell::new(CollectionState::default());
        let epoch = Arc::new(AtomicU64::new(0));

        let session_watch = config
            .reset_projects_on_logout
            .then(|| watch_session(&session, state.clone(), Arc::clone(&epoch)));

        Ok(Self {
            remote,
            session,
            config,
            watch: state.derive(CollectionState::clone),
            projects: state.derive(|s: &CollectionState<Project>| s.items.clone()),
            loading: state.derive(|s: &CollectionState<Project>| s.loading),
            stats: state.derive(|s: &CollectionState<Project>| ProjectStats::from_projects(&s.items)),
            state,
            in_flight: Arc::new(AtomicUsize::new(0)),
            epoch,
            _session_watch: session_watch,
        })
    }

    /// Replace the collection with the collaborator's list, in its order.
    pub async fn load_all(&self) -> TaskflowResult<Vec<Project>> {
        let op = self.begin("load_all");
        let projects = self
            .remote
            .list_projects()
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to load projects"))?;

        debug!(count = projects.len(), "Loaded projects");
        let loaded = projects.clone();
        op.settle(move |items| *items = loaded);
        Ok(projects)
    }

    /// Look a project up in the current snapshot.
    pub fn get_by_id(&self, id: &str) -> Option<Project> {
        self.state
            .with(|s| s.items.iter().find(|p| p.id == id).cloned())
    }

    /// Reactive `get_by_id`.
    pub fn select(&self, id: impl Into<String>) -> Derived<Option<Project>> {
        let id = id.into();
        self.projects
            .map(move |items| items.iter().find(|p| p.id == id).cloned())
    }

    /// Create a project owned by the signed-in user and append it.
    pub async fn create(&self, request: CreateProjectRequest) -> TaskflowResult<Project> {
        let owner_id = self.acting_user_id()?;
        let new_project = NewProject::owned_by(request, owner_id);

        let op = self.begin("create");
        let project = self
            .remote
            .create_project(&new_project)
            .await
            .inspect_err(|e| warn!(name = %new_project.name, error = %e, "Failed to create project"))?;

        debug!(project_id = %project.id, owner_id = %project.owner_id, "Created project");
        let created = project.clone();
        op.settle(move |items| items.push(created));
        Ok(project)
    }

    /// Merge `request` over the existing project and save it.
    ///
    /// Fails with `ProjectNotFound` without contacting the collaborator when
    /// the id is not in the collection. The saved project replaces the old
    /// one in place.
    pub async fn update(&self, request: UpdateProjectRequest) -> TaskflowResult<Project> {
        let existing = self
            .get_by_id(&request.id)
            .ok_or_else(|| TaskflowError::ProjectNotFound(request.id.clone()))?;
        let merged = existing.merged_with(&request);

        let op = self.begin("update");
        let saved = self
            .remote
            .update_project(&merged)
            .await
            .inspect_err(|e| warn!(project_id = %request.id, error = %e, "Failed to update project"))?;

        debug!(project_id = %saved.id, "Updated project");
        let replacement = saved.clone();
        op.settle(move |items| {
            match items.iter_mut().find(|p| p.id == replacement.id) {
                Some(slot) => *slot = replacement,
                None => debug!(project_id = %replacement.id, "Updated project no longer listed"),
            }
        });
        Ok(saved)
    }

    /// Delete a project. The collection is untouched on failure.
    pub async fn delete(&self, id: &str) -> TaskflowResult<()> {
        let op = self.begin("delete");
        self.remote
            .delete_project(id)
            .await
            .inspect_err(|e| warn!(project_id = %id, error = %e, "Failed to delete project"))?;

        debug!(project_id = %id, "Deleted project");
        op.settle(|items| items.retain(|p| p.id != id));
        Ok(())
    }

    /// Drop every project. Operations already in flight will not repopulate
    /// the collection.
    pub fn clear(&self) {
        reset(&self.state, &self.epoch);
    }

    /// Snapshot of the collection and flag.
    pub fn snapshot(&self) -> CollectionState<Project> {
        self.state.read()
    }

    /// Collection and flag as one subscribable value.
    pub fn watch(&self) -> &Derived<CollectionState<Project>> {
        &self.watch
    }

    pub fn projects(&self) -> &Derived<Vec<Project>> {
        &self.projects
    }

    pub fn is_loading(&self) -> &Derived<bool> {
        &self.loading
    }

    pub fn stats(&self) -> &Derived<ProjectStats> {
        &self.stats
    }

    fn acting_user_id(&self) -> TaskflowResult<String> {
        if let Some(user) = self.session.current_user().read() {
            return Ok(user.id);
        }
        match &self.config.ownership {
            OwnershipPolicy::RequireSession => Err(TaskflowError::NotAuthenticated),
            OwnershipPolicy::Placeholder { owner_id } => {
                warn!(owner_id = %owner_id, "Creating project without a session, using placeholder owner");
                Ok(owner_id.clone())
            }
        }
    }

    fn begin(&self, operation: &'static str) -> InFlight<'_> {
        let in_flight = &self.in_flight;
        self.state.update(|s| {
            in_flight.fetch_add(1, Ordering::SeqCst);
            s.loading = true;
        });
        debug!(operation, "Project operation started");
        InFlight {
            store: self,
            operation,
            epoch: self.epoch.load(Ordering::SeqCst),
            settled: false,
        }
    }
}

/// An outstanding operation. Settling or dropping it releases the loading flag.
struct InFlight<'a> {
    store: &'a ProjectStore,
    operation: &'static str,
    epoch: u64,
    settled: bool,
}

impl InFlight<'_> {
    /// Apply `f` to the collection and release the flag in the same update.
    fn settle(mut self, f: impl FnOnce(&mut Vec<Project>)) {
        self.settled = true;
        let stale = self.store.epoch.load(Ordering::SeqCst) != self.epoch;
        if stale {
            debug!(operation = self.operation, "Discarding result from before reset");
        }
        let in_flight = &self.store.in_flight;
        self.store.state.update(|s| {
            if !stale {
                f(&mut s.items);
            }
            s.loading = in_flight.fetch_sub(1, Ordering::SeqCst) > 1;
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        debug!(operation = self.operation, "Project operation ended without result");
        let in_flight = &self.store.in_flight;
        self.store.state.update(|s| {
            s.loading = in_flight.fetch_sub(1, Ordering::SeqCst) > 1;
        });
    }
}

fn reset(state: &StateCell<CollectionState<Project>>, epoch: &AtomicU64) {
    epoch.fetch_add(1, Ordering::SeqCst);
    state.update(|s| s.items.clear());
}

/// Clear the collection whenever the signed-in user goes away or changes.
fn watch_session(
    session: &SessionStore,
    state: StateCell<CollectionState<Project>>,
    epoch: Arc<AtomicU64>,
) -> Subscription {
    let mut last_user: Option<String> = None;
    session.watch().subscribe(move |current: &SessionState| {
        let user = current.user().map(|u| u.id.clone());
        if last_user.is_some() && user != last_user {
            debug!(previous = ?last_user, "Session changed, clearing projects");
            reset(&state, &epoch);
        }
        last_user = user;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::codec::SessionCodec;
    use crate::session::model::Credentials;
    use crate::testing::StubRemote;
    use taskflow_storage::MemoryStore;

    struct Fixture {
        remote: Arc<StubRemote>,
        session: Arc<SessionStore>,
        projects: ProjectStore,
    }

    fn fixture(remote: StubRemote, config: StoreConfig) -> Fixture {
        let remote = Arc::new(remote);
        let codec = SessionCodec::new(Arc::new(MemoryStore::new()));
        let session = Arc::new(SessionStore::new(remote.clone(), codec));
        session.initialize();
        let projects = ProjectStore::new(remote.clone(), Arc::clone(&session), config).unwrap();
        Fixture {
            remote,
            session,
            projects,
        }
    }

    async fn signed_in(remote: StubRemote) -> Fixture {
        let f = fixture(remote, StoreConfig::default());
        f.session
            .login(&Credentials::new("demo@taskflow.com", "x"))
            .await
            .unwrap();
        f
    }

    #[tokio::test]
    async fn test_load_all_replaces_collection_in_order() {
        let f = signed_in(StubRemote::seeded()).await;
        let loaded = f.projects.load_all().await.unwrap();

        let ids: Vec<_> = f.projects.projects().read().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(loaded.len(), 2);
        assert!(!f.projects.is_loading().read());
    }

    #[tokio::test]
    async fn test_create_sets_ownership_and_appends() {
        let f = signed_in(StubRemote::seeded()).await;
        f.projects.load_all().await.unwrap();
        let user_id = f.session.current_user().read().unwrap().id;

        let created = f
            .projects
            .create(CreateProjectRequest::new("P3", "third", "#000"))
            .await
            .unwrap();

        let found = f.projects.get_by_id(&created.id).unwrap();
        assert_eq!(found.owner_id, user_id);
        assert!(found.has_member(&user_id));

        let items = f.projects.projects().read();
        assert_eq!(items.len(), 3);
        assert_eq!(items.last().map(|p| p.name.as_str()), Some("P3"));
    }

    #[tokio::test]
    async fn test_create_without_session_is_refused_by_default() {
        let f = fixture(StubRemote::seeded(), StoreConfig::default());
        let err = f
            .projects
            .create(CreateProjectRequest::new("P", "", "#fff"))
            .await
            .unwrap_err();

        assert!(matches!(err, TaskflowError::NotAuthenticated));
        assert_eq!(f.remote.project_calls(), 0);
        assert!(!f.projects.is_loading().read());
    }

    #[tokio::test]
    async fn test_create_without_session_uses_configured_placeholder() {
        let config = StoreConfig {
            ownership: OwnershipPolicy::Placeholder {
                owner_id: "1".to_string(),
            },
            ..StoreConfig::default()
        };
        let f = fixture(StubRemote::seeded(), config);
        let created = f
            .projects
            .create(CreateProjectRequest::new("P", "", "#fff"))
            .await
            .unwrap();
        assert_eq!(created.owner_id, "1");
        assert_eq!(created.member_ids, vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_changes_only_requested_fields_in_place() {
        let f = signed_in(StubRemote::seeded()).await;
        f.projects.load_all().await.unwrap();
        let before = f.projects.get_by_id("1").unwrap();

        f.projects
            .update(UpdateProjectRequest::new("1").name("X"))
            .await
            .unwrap();

        let after = f.projects.get_by_id("1").unwrap();
        assert_eq!(after.name, "X");
        assert!(after.updated_at > before.updated_at);
        assert_eq!(
            Project {
                name: before.name.clone(),
                updated_at: before.updated_at,
                ..after
            },
            before
        );
        assert_eq!(f.projects.projects().read()[0].id, "1");
    }

    #[tokio::test]
    async fn test_update_missing_fails_fast() {
        let f = signed_in(StubRemote::seeded()).await;
        f.projects.load_all().await.unwrap();
        let before = f.projects.snapshot();
        let calls = f.remote.project_calls();

        let err = f
            .projects
            .update(UpdateProjectRequest::new("missing").name("X"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(f.remote.project_calls(), calls);
        assert_eq!(f.projects.snapshot(), before);
    }

    #[tokio::test]
    async fn test_delete_removes_and_clears_flag() {
        let f = signed_in(StubRemote::seeded()).await;
        f.projects.load_all().await.unwrap();

        f.projects.delete("1").await.unwrap();
        assert!(f.projects.get_by_id("1").is_none());
        assert!(!f.projects.is_loading().read());

        let err = f.projects.delete("1").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!f.projects.is_loading().read());
        assert_eq!(f.projects.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_collection_and_clears_flag() {
        let f = signed_in(StubRemote::seeded()).await;
        f.projects.load_all().await.unwrap();
        let before = f.projects.snapshot();

        f.remote.fail_next(TaskflowError::transport("offline"));
        let err = f.projects.load_all().await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(f.projects.snapshot(), before);
        assert!(!f.projects.is_loading().read());
    }

    #[tokio::test]
    async fn test_flag_is_set_while_in_flight() {
        let f = signed_in(StubRemote::seeded().gated()).await;
        let observed = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let _sub = f
            .projects
            .is_loading()
            .subscribe(move |loading: &bool| sink.lock().unwrap().push(*loading));

        let load = f.projects.load_all();
        let release = async {
            tokio::task::yield_now().await;
            assert!(f.projects.is_loading().read());
            f.remote.release(1);
        };
        let (result, ()) = tokio::join!(load, release);

        result.unwrap();
        assert!(!f.projects.is_loading().read());
        assert_eq!(*observed.lock().unwrap(), vec![false, true, false]);
    }

    #[tokio::test]
    async fn test_dropped_operation_clears_flag() {
        let f = signed_in(StubRemote::seeded().gated()).await;
        {
            let load = f.projects.load_all();
            tokio::pin!(load);
            assert!(futures::poll!(load.as_mut()).is_pending());
            assert!(f.projects.is_loading().read());
        }
        assert!(!f.projects.is_loading().read());
    }

    #[tokio::test]
    async fn test_logout_mid_flight_discards_stale_result() {
        let f = signed_in(StubRemote::seeded().gated()).await;

        let create = f
            .projects
            .create(CreateProjectRequest::new("late", "", "#fff"));
        let interrupt = async {
            tokio::task::yield_now().await;
            f.session.logout();
            f.remote.release(1);
        };
        let (result, ()) = tokio::join!(create, interrupt);

        assert!(result.is_ok());
        assert!(f.projects.snapshot().is_empty());
        assert!(!f.projects.is_loading().read());
    }

    #[tokio::test]
    async fn test_logout_keeps_projects_when_reset_disabled() {
        let config = StoreConfig {
            reset_projects_on_logout: false,
            ..StoreConfig::default()
        };
        let f = fixture(StubRemote::seeded(), config);
        f.session
            .login(&Credentials::new("demo@taskflow.com", "x"))
            .await
            .unwrap();
        f.projects.load_all().await.unwrap();

        f.session.logout();
        assert_eq!(f.projects.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_select_and_stats_follow_collection() {
        let f = signed_in(StubRemote::seeded()).await;
        let selected = f.projects.select("2");
        assert!(selected.read().is_none());

        f.projects.load_all().await.unwrap();
        assert_eq!(selected.read().map(|p| p.id), Some("2".to_string()));

        f.projects
            .update(UpdateProjectRequest::new("2").completed(true))
            .await
            .unwrap();
        let stats = f.projects.stats().read();
        assert_eq!((stats.total, stats.completed, stats.active), (2, 1, 1));
    }
}
