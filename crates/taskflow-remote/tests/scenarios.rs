//! End-to-end store scenarios against the in-memory remote.

use std::sync::{Arc, Mutex};
use std::task::Poll;

use futures::StreamExt;
use taskflow_core::session::codec::{TOKEN_KEY, USER_KEY};
use taskflow_core::{
    navigation, CreateProjectRequest, Credentials, GuardDecision, ProjectStore, Route,
    SessionCodec, SessionState, SessionStore, StoreConfig, TaskflowError, UpdateProjectRequest,
};
use taskflow_remote::{MockRemote, MockRemoteConfig, RemoteOp};
use taskflow_storage::{FileStore, KeyValueStore, MemoryStore};

struct App {
    remote: Arc<MockRemote>,
    storage: Arc<dyn KeyValueStore>,
    session: Arc<SessionStore>,
    projects: ProjectStore,
}

fn boot(storage: Arc<dyn KeyValueStore>) -> App {
    let remote = Arc::new(MockRemote::new(MockRemoteConfig::instant()));
    let session = Arc::new(SessionStore::new(
        remote.clone(),
        SessionCodec::new(storage.clone()),
    ));
    session.initialize();
    let projects =
        ProjectStore::new(remote.clone(), Arc::clone(&session), StoreConfig::default()).unwrap();
    App {
        remote,
        storage,
        session,
        projects,
    }
}

async fn signed_in() -> App {
    let app = boot(Arc::new(MemoryStore::new()));
    app.session
        .login(&Credentials::new("demo@taskflow.com", "x"))
        .await
        .unwrap();
    app
}

#[tokio::test]
async fn login_authenticates_and_persists_token() {
    let app = boot(Arc::new(MemoryStore::new()));
    assert_eq!(
        navigation::evaluate(Route::Projects, app.session.is_authenticated().read()),
        GuardDecision::Redirect(Route::Login)
    );

    app.session
        .login(&Credentials::new("demo@taskflow.com", "x"))
        .await
        .unwrap();

    assert!(matches!(app.session.state(), SessionState::Authenticated(_)));
    assert!(app.session.is_authenticated().read());
    let token = app.storage.get(TOKEN_KEY).unwrap();
    assert!(token.is_some_and(|t| !t.is_empty()));
    assert_eq!(
        navigation::evaluate(Route::Login, app.session.is_authenticated().read()),
        GuardDecision::Redirect(Route::Dashboard)
    );
}

#[tokio::test]
async fn create_after_load_appends_third_project() {
    let app = signed_in().await;
    assert_eq!(app.projects.load_all().await.unwrap().len(), 2);

    let created = app
        .projects
        .create(CreateProjectRequest::new("P3", "third", "#ff9800"))
        .await
        .unwrap();

    let items = app.projects.projects().read();
    assert_eq!(items.len(), 3);
    assert_eq!(items[2].id, created.id);
    assert_eq!(items[2].name, "P3");

    let user_id = app.session.current_user().read().unwrap().id;
    let found = app.projects.get_by_id(&created.id).unwrap();
    assert_eq!(found.owner_id, user_id);
    assert!(found.member_ids.contains(&user_id));
}

#[tokio::test]
async fn update_touches_only_name_and_timestamp() {
    let app = signed_in().await;
    app.projects.load_all().await.unwrap();
    let before = app.projects.get_by_id("2").unwrap();

    app.projects
        .update(UpdateProjectRequest::new("2").name("X"))
        .await
        .unwrap();

    let after = app.projects.get_by_id("2").unwrap();
    assert_eq!(after.name, "X");
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.description, before.description);
    assert_eq!(after.color, before.color);
    assert_eq!(after.owner_id, before.owner_id);
    assert_eq!(after.member_ids, before.member_ids);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.is_completed, before.is_completed);
}

#[tokio::test]
async fn update_of_missing_project_leaves_collection_alone() {
    let app = signed_in().await;
    app.projects.load_all().await.unwrap();
    let before = app.projects.projects().read();

    let err = app
        .projects
        .update(UpdateProjectRequest::new("missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, TaskflowError::ProjectNotFound(id) if id == "missing"));
    assert_eq!(app.projects.projects().read(), before);
}

#[tokio::test]
async fn delete_then_lookup_is_not_found_and_flag_settles() {
    let app = signed_in().await;
    app.projects.load_all().await.unwrap();

    app.projects.delete("1").await.unwrap();
    assert!(app.projects.get_by_id("1").is_none());
    assert!(!app.projects.is_loading().read());

    app.remote
        .fail_next(RemoteOp::DeleteProject, TaskflowError::transport("timeout"));
    let err = app.projects.delete("2").await.unwrap_err();
    assert!(err.is_transport());
    assert!(app.projects.get_by_id("2").is_some());
    assert!(!app.projects.is_loading().read());
}

#[tokio::test]
async fn overlapping_operations_keep_flag_until_last_settles() {
    let remote = Arc::new(MockRemote::new(MockRemoteConfig {
        list_latency_ms: 50,
        mutation_latency_ms: 10,
        auth_latency_ms: 0,
        seed_demo_projects: true,
    }));
    let session = Arc::new(SessionStore::new(
        remote.clone(),
        SessionCodec::new(Arc::new(MemoryStore::new())),
    ));
    session.initialize();
    session
        .login(&Credentials::new("demo@taskflow.com", "x"))
        .await
        .unwrap();
    let projects = ProjectStore::new(remote, session, StoreConfig::default()).unwrap();

    let flags = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&flags);
    let _sub = projects
        .is_loading()
        .subscribe(move |loading: &bool| sink.lock().unwrap().push(*loading));

    let (loaded, created) = tokio::join!(
        projects.load_all(),
        projects.create(CreateProjectRequest::new("quick", "", "#fff"))
    );
    loaded.unwrap();
    created.unwrap();

    let flags = flags.lock().unwrap().clone();
    assert_eq!(flags.first(), Some(&false));
    assert_eq!(flags.last(), Some(&false));
    // Only the final settle clears the flag.
    assert_eq!(flags.iter().skip(1).filter(|f| !**f).count(), 1);
    assert!(!projects.is_loading().read());
}

#[tokio::test]
async fn both_channels_agree_on_every_change() {
    let app = signed_in().await;
    let mut stream = app.projects.projects().stream();

    app.projects.load_all().await.unwrap();
    app.projects
        .create(CreateProjectRequest::new("P3", "", "#000"))
        .await
        .unwrap();
    let latest = app.projects.projects().read();

    let mut seen = Vec::new();
    while let Poll::Ready(Some(items)) = futures::poll!(stream.next()) {
        seen.push(items);
    }
    let lengths: Vec<usize> = seen.iter().map(Vec::len).collect();
    assert_eq!(lengths.first(), Some(&0));
    assert_eq!(seen.last(), Some(&latest));
    assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn session_restores_from_file_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = boot(Arc::new(FileStore::new(&path)));
    let user = first
        .session
        .login(&Credentials::new("demo@taskflow.com", "x"))
        .await
        .unwrap();
    drop(first);

    let second = boot(Arc::new(FileStore::new(&path)));
    assert_eq!(second.session.state(), SessionState::Authenticated(user.clone()));
    assert_eq!(second.session.token(), Some(user.token));
}

#[tokio::test]
async fn malformed_persisted_session_is_cleared_on_restore() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    storage.set(TOKEN_KEY, "tok").unwrap();
    storage.set(USER_KEY, "{malformed").unwrap();

    let app = boot(storage);

    assert_eq!(app.session.state(), SessionState::Unauthenticated);
    assert!(app.storage.get(TOKEN_KEY).unwrap().is_none());
    assert!(app.storage.get(USER_KEY).unwrap().is_none());
}

#[tokio::test]
async fn logout_clears_projects_from_the_previous_user() {
    let app = signed_in().await;
    app.projects.load_all().await.unwrap();

    app.session.logout();

    assert!(app.projects.snapshot().is_empty());
    assert!(!app.session.is_authenticated().read());
}
